//! Symbol attachment through a test factory.

#[path = "../src/test/image.rs"]
mod image;

use std::{
    fs,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
};

use dotbind::{
    prelude::*,
    symbols::{detect_symbol_format, SymbolFormat, MSF_SIGNATURE},
    ContextConfig,
};
use image::ImageBuilder;

struct FixedReader {
    document: String,
}

impl SymbolReader for FixedReader {
    fn sequence_points(&self, method: Token) -> Vec<SequencePoint> {
        vec![SequencePoint {
            offset: 0,
            document: self.document.clone(),
            start_line: method.row(),
            start_column: 1,
            end_line: method.row(),
            end_column: 10,
        }]
    }

    fn local_variable_names(&self, _method: Token) -> Vec<String> {
        vec!["i".to_string(), "total".to_string()]
    }
}

#[derive(Default)]
struct CountingFactory {
    portable: AtomicUsize,
    legacy: AtomicUsize,
}

impl SymbolReaderFactory for CountingFactory {
    fn open_portable(&self, pdb_path: &Path) -> Result<Option<Arc<dyn SymbolReader>>> {
        self.portable.fetch_add(1, Ordering::SeqCst);
        let data = fs::read(pdb_path)?;
        if detect_symbol_format(&data) != Some(SymbolFormat::Portable) {
            return Ok(None);
        }

        Ok(Some(Arc::new(FixedReader {
            document: "portable.cs".to_string(),
        })))
    }

    fn open_legacy(&self, module_path: &Path) -> Result<Option<Arc<dyn SymbolReader>>> {
        self.legacy.fetch_add(1, Ordering::SeqCst);
        let data = fs::read(module_path.with_extension("pdb"))?;
        if detect_symbol_format(&data) != Some(SymbolFormat::Legacy) {
            return Ok(None);
        }

        Ok(Some(Arc::new(FixedReader {
            document: "legacy.cs".to_string(),
        })))
    }
}

fn method(module: &Module, row: u32) -> MethodHandle {
    MethodHandle::new(module.id(), Token::new(0x0600_0000 | row))
}

#[test]
fn portable_symbols() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = ImageBuilder::assembly("App").write_to(dir.path(), "App.dll");
    fs::write(dir.path().join("App.pdb"), b"BSJB\x01\x00\x01\x00")?;

    let factory = Arc::new(CountingFactory::default());
    let context = CompilationContextBuilder::new()
        .input_file("App", &path)
        .symbol_reader_factory(factory.clone())
        .build()?;

    let module = context.module_for_simple_name("App", true)?.unwrap();
    let points = context.sequence_points_for(method(&module, 3)).unwrap();
    assert_eq!(points[0].document, "portable.cs");
    assert_eq!(points[0].start_line, 3);

    let locals = context.local_variable_names_for(method(&module, 3)).unwrap();
    assert_eq!(locals, vec!["i", "total"]);

    assert_eq!(factory.portable.load(Ordering::SeqCst), 1);
    assert_eq!(factory.legacy.load(Ordering::SeqCst), 0);
    assert!(module.symbol_reader().is_some());
    Ok(())
}

#[test]
fn legacy_symbols() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = ImageBuilder::assembly("Old").write_to(dir.path(), "Old.dll");

    let mut pdb = MSF_SIGNATURE.to_vec();
    pdb.extend_from_slice(&[0u8; 32]);
    fs::write(dir.path().join("Old.pdb"), pdb)?;

    let factory = Arc::new(CountingFactory::default());
    let context = CompilationContextBuilder::new()
        .reference_file("Old", &path)
        .symbol_reader_factory(factory.clone())
        .build()?;

    let module = context.module_for_simple_name("Old", true)?.unwrap();
    let points = context.sequence_points_for(method(&module, 1)).unwrap();
    assert_eq!(points[0].document, "legacy.cs");

    assert_eq!(factory.portable.load(Ordering::SeqCst), 1);
    assert_eq!(factory.legacy.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn missing_symbols_are_remembered() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = ImageBuilder::assembly("Bare").write_to(dir.path(), "Bare.dll");

    let factory = Arc::new(CountingFactory::default());
    let context = CompilationContextBuilder::new()
        .input_file("Bare", &path)
        .symbol_reader_factory(factory.clone())
        .build()?;

    let module = context.module_for_simple_name("Bare", true)?.unwrap();
    assert!(context.sequence_points_for(method(&module, 1)).is_none());
    assert!(context.local_variable_names_for(method(&module, 1)).is_none());

    // A symbol file appearing later is not picked up
    fs::write(dir.path().join("Bare.pdb"), b"BSJB")?;
    assert!(context.attach_symbols(&module).is_none());
    assert_eq!(factory.portable.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn attach_once_under_contention() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = ImageBuilder::assembly("Busy").write_to(dir.path(), "Busy.dll");
    fs::write(dir.path().join("Busy.pdb"), b"BSJB\x01\x00\x01\x00")?;

    let factory = Arc::new(CountingFactory::default());
    let context = Arc::new(
        CompilationContextBuilder::new()
            .input_file("Busy", &path)
            .symbol_reader_factory(factory.clone())
            .build()?,
    );
    let module = context.module_for_simple_name("Busy", true)?.unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let context = Arc::clone(&context);
            let module = Arc::clone(&module);
            thread::spawn(move || context.attach_symbols(&module).is_some())
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(factory.portable.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn symbols_disabled() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = ImageBuilder::assembly("Quiet").write_to(dir.path(), "Quiet.dll");
    fs::write(dir.path().join("Quiet.pdb"), b"BSJB")?;

    let factory = Arc::new(CountingFactory::default());
    let context = CompilationContextBuilder::new()
        .input_file("Quiet", &path)
        .symbol_reader_factory(factory.clone())
        .config(ContextConfig::without_symbols())
        .build()?;

    let module = context.module_for_simple_name("Quiet", true)?.unwrap();
    assert!(context.attach_symbols(&module).is_none());
    assert_eq!(factory.portable.load(Ordering::SeqCst), 0);
    Ok(())
}

struct Method {
    handle: MethodHandle,
    is_static: bool,
    names: Vec<String>,
}

impl MethodMetadata for Method {
    fn handle(&self) -> MethodHandle {
        self.handle
    }

    fn is_static(&self) -> bool {
        self.is_static
    }

    fn parameter_names(&self) -> &[String] {
        &self.names
    }
}

#[test]
fn parameter_names() -> Result<()> {
    let context = CompilationContextBuilder::new().build()?;
    let instance = Method {
        handle: MethodHandle::new(ModuleId::from_raw(1), Token::new(0x0600_0001)),
        is_static: false,
        names: vec!["left".to_string(), "right".to_string()],
    };

    let names = context.parameter_names_for(&instance);
    assert_eq!(names.clone().count(), 3);
    assert_eq!(names.collect::<Vec<_>>(), ["_this", "left", "right"]);

    let static_method = Method {
        is_static: true,
        ..instance
    };
    assert_eq!(
        context.parameter_names_for(&static_method).collect::<Vec<_>>(),
        ["left", "right"]
    );
    Ok(())
}
