//! Workers sharing one context.

#[path = "../src/test/image.rs"]
mod image;

use std::{
    fs,
    sync::{Arc, Barrier},
    thread,
};

use dotbind::prelude::*;
use image::ImageBuilder;
use rayon::prelude::*;

const WORKERS: usize = 16;

#[test]
fn concurrent_name_lookups_share_one_module() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = ImageBuilder::assembly("Shared").write_to(dir.path(), "Shared.dll");

    let context = Arc::new(
        CompilationContextBuilder::new()
            .reference_file("Shared", &path)
            .build()?,
    );
    let barrier = Arc::new(Barrier::new(WORKERS));

    let handles: Vec<_> = (0..WORKERS)
        .map(|_| {
            let context = Arc::clone(&context);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                context.module_for_simple_name("Shared", true)
            })
        })
        .collect();

    let modules = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect::<Result<Vec<_>>>()?;

    let first = modules[0].as_ref().unwrap();
    for module in &modules {
        assert!(Arc::ptr_eq(first, module.as_ref().unwrap()));
    }
    assert_eq!(context.catalog().loaded_modules().len(), 1);
    Ok(())
}

#[test]
fn parallel_path_and_name_lookups() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let names = ["Alpha", "Beta", "Gamma", "Delta"];
    for name in names {
        ImageBuilder::assembly(name).write_to(dir.path(), &format!("{name}.dll"));
    }

    let context = CompilationContextBuilder::new()
        .reference_table(
            names
                .iter()
                .map(|name| (*name, vec![dir.path().join(format!("{name}.dll"))])),
        )
        .build()?;

    let resolved = (0..64)
        .into_par_iter()
        .map(|i| {
            let name = names[i % names.len()];
            if i % 2 == 0 {
                context.module_from_path(&dir.path().join(format!("{name}.dll")))
            } else {
                context
                    .module_for_simple_name(name, true)
                    .map(|module| module.unwrap())
            }
        })
        .collect::<Result<Vec<_>>>()?;

    for module in &resolved {
        let again = context.module_for_simple_name(module.simple_name(), true)?.unwrap();
        assert!(Arc::ptr_eq(module, &again));
    }
    assert_eq!(context.catalog().loaded_modules().len(), names.len());
    Ok(())
}

#[test]
fn preload_then_resolve() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let good = ImageBuilder::assembly("Good").write_to(dir.path(), "Good.dll");
    let bad = dir.path().join("Bad.dll");
    fs::write(&bad, b"not a module")?;

    let context = CompilationContextBuilder::new()
        .input_file("Good", &good)
        .input_file("Bad", &bad)
        .build()?;

    let failures = context.preload();
    assert_eq!(failures.len(), 1);
    assert!(matches!(failures[0], Error::LoadError { .. }));

    let loaded = context.catalog().loaded_modules();
    assert_eq!(loaded.len(), 1);

    let module = context.module_for_simple_name("Good", true)?.unwrap();
    assert!(Arc::ptr_eq(&loaded[0], &module));
    Ok(())
}

#[test]
fn delegate_info_is_shared() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = ImageBuilder::assembly("Events")
        .type_defs(4)
        .write_to(dir.path(), "Events.dll");

    let context = CompilationContextBuilder::new()
        .input_file("Events", &path)
        .build()?;
    let module = context.module_for_simple_name("Events", true)?.unwrap();
    let ty = module.type_handle(2).unwrap();

    let infos: Vec<_> = (0..WORKERS)
        .into_par_iter()
        .map(|_| context.delegate_info(ty))
        .collect();

    for info in &infos {
        assert!(Arc::ptr_eq(&infos[0], info));
    }
    assert_eq!(infos[0].delegate_type(), ty);
    Ok(())
}
