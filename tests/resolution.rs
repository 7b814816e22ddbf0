//! Assembly resolution over crafted modules on disk.

#[path = "../src/test/image.rs"]
mod image;

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use dotbind::{prelude::*, ContextConfig};
use image::{ImageBuilder, ECMA_PUBLIC_KEY};
use tempfile::TempDir;

fn write(dir: &Path, sub: &str, file_name: &str, builder: ImageBuilder) -> PathBuf {
    let target = dir.join(sub);
    fs::create_dir_all(&target).unwrap();
    builder.write_to(&target, file_name)
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap()
}

/// `A` v1.0 is being compiled, `A` v2.0 is a reference.
fn two_versions() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let x = write(dir.path(), "x", "A.dll", ImageBuilder::assembly("A").version(1, 0, 0, 0));
    let y = write(dir.path(), "y", "A.dll", ImageBuilder::assembly("A").version(2, 0, 0, 0));
    (dir, x, y)
}

#[test]
fn version_constraint_picks_reference() -> Result<()> {
    let (_dir, x, y) = two_versions();

    let context = CompilationContextBuilder::new()
        .input_file("A", &x)
        .reference_file("A", &y)
        .build()?;

    let request = AssemblyNameRequest::new("A").with_version(AssemblyVersion::new(1, 5, 0, 0));
    let module = context.resolve_assembly(&request, true)?.unwrap();

    assert_eq!(module.path(), canonical(&y));
    assert_eq!(module.version(), Some(AssemblyVersion::new(2, 0, 0, 0)));
    Ok(())
}

#[test]
fn ambiguous_match_uses_last_candidate() -> Result<()> {
    let (_dir, x, y) = two_versions();

    let context = CompilationContextBuilder::new()
        .input_file("A", &x)
        .reference_file("A", &y)
        .build()?;

    let module = context.module_for_simple_name("A", true)?.unwrap();
    assert_eq!(module.path(), canonical(&y));

    let request = AssemblyNameRequest::parse("A, Version=1.0")?;
    let module = context.resolve_assembly(&request, false)?.unwrap();
    assert_eq!(module.path(), canonical(&y));
    Ok(())
}

#[test]
fn ambiguous_match_can_be_fatal() -> Result<()> {
    let (_dir, x, y) = two_versions();

    let context = CompilationContextBuilder::new()
        .input_file("A", &x)
        .reference_file("A", &y)
        .config(ContextConfig::strict())
        .build()?;

    match context.module_for_simple_name("A", true) {
        Err(Error::AmbiguousMatch { candidates, .. }) => {
            assert_eq!(candidates, vec![canonical(&x), canonical(&y)]);
        }
        other => panic!("unexpected result {other:?}"),
    }

    // Non-strict requests never fail
    assert!(context.module_for_simple_name("A", false)?.is_some());
    Ok(())
}

#[test]
fn no_compatible_candidate() -> Result<()> {
    let (_dir, x, y) = two_versions();

    let context = CompilationContextBuilder::new()
        .input_file("A", &x)
        .reference_file("A", &y)
        .build()?;

    let request = AssemblyNameRequest::new("A").with_version(AssemblyVersion::new(3, 0, 0, 0));
    assert!(matches!(
        context.resolve_assembly(&request, true),
        Err(Error::NotFound(_))
    ));
    assert!(context.resolve_assembly(&request, false)?.is_none());
    Ok(())
}

#[test]
fn single_candidate_checked_only_when_strict() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "lib", "B.dll", ImageBuilder::assembly("B").version(1, 0, 0, 0));

    let context = CompilationContextBuilder::new()
        .reference_file("B", &path)
        .build()?;

    let request = AssemblyNameRequest::parse("B, Version=2.0.0.0")?;
    match context.resolve_assembly(&request, true) {
        Err(Error::IncompatibleVersion { requested, found }) => {
            assert_eq!(requested, "B, Version=2.0.0.0");
            assert!(found.starts_with("B, Version=1.0.0.0"));
        }
        other => panic!("unexpected result {other:?}"),
    }

    let module = context.resolve_assembly(&request, false)?.unwrap();
    assert_eq!(module.version(), Some(AssemblyVersion::new(1, 0, 0, 0)));
    Ok(())
}

#[test]
fn unknown_name() -> Result<()> {
    let context = CompilationContextBuilder::new().build()?;

    assert!(matches!(
        context.module_for_simple_name("Nowhere", true),
        Err(Error::NotFound(name)) if name == "Nowhere"
    ));
    assert!(context.module_for_simple_name("Nowhere", false)?.is_none());
    Ok(())
}

#[test]
fn names_match_case_insensitively_in_tables() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "lib", "MyLib.dll", ImageBuilder::assembly("MyLib"));

    let context = CompilationContextBuilder::new()
        .reference_file("mylib", &path)
        .build()?;

    // The table lookup ignores case, the declared name keeps its own
    let module = context.module_for_simple_name("MYLIB", false)?.unwrap();
    assert_eq!(module.simple_name(), "MyLib");

    // Compatibility compares declared names exactly
    let request = AssemblyNameRequest::new("MyLib");
    assert!(context.resolve_assembly(&request, true)?.is_some());
    assert!(matches!(
        context.resolve_assembly(&AssemblyNameRequest::new("MYLIB"), true),
        Err(Error::IncompatibleVersion { .. })
    ));
    Ok(())
}

#[test]
fn strong_name_tokens() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let signed = write(
        dir.path(),
        "signed",
        "S.dll",
        ImageBuilder::assembly("S").public_key(&ECMA_PUBLIC_KEY),
    );
    let unsigned = write(dir.path(), "unsigned", "U.dll", ImageBuilder::assembly("U"));

    let context = CompilationContextBuilder::new()
        .reference_file("S", &signed)
        .reference_file("U", &unsigned)
        .build()?;

    let request = AssemblyNameRequest::parse("S, PublicKeyToken=b77a5c561934e089")?;
    assert!(context.resolve_assembly(&request, true)?.is_some());

    let request = AssemblyNameRequest::parse("S, PublicKeyToken=b77a5c561934e08a")?;
    assert!(matches!(
        context.resolve_assembly(&request, true),
        Err(Error::IncompatibleVersion { .. })
    ));

    // A module without a token satisfies any token constraint
    let request = AssemblyNameRequest::parse("U, PublicKeyToken=abcd")?;
    assert!(context.resolve_assembly(&request, true)?.is_some());
    Ok(())
}

#[test]
fn declared_name_mismatch() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "lib", "C.dll", ImageBuilder::assembly("NotC"));

    let context = CompilationContextBuilder::new()
        .reference_file("C", &path)
        .build()?;

    match context.module_for_simple_name("C", true) {
        Err(Error::NameMismatch {
            expected, actual, ..
        }) => {
            assert_eq!(expected, "C");
            assert_eq!(actual, "NotC");
        }
        other => panic!("unexpected result {other:?}"),
    }
    assert!(context.module_for_simple_name("C", false)?.is_none());

    // Loading by path skips the name check
    let module = context.module_from_path(&path)?;
    assert_eq!(module.simple_name(), "NotC");
    Ok(())
}

#[test]
fn corrupt_candidate() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("D.dll");
    fs::write(&path, b"MZ definitely not a PE image")?;

    let context = CompilationContextBuilder::new()
        .reference_file("D", &path)
        .build()?;

    match context.module_for_simple_name("D", true) {
        Err(Error::LoadError { path: failed, .. }) => assert_eq!(failed, canonical(&path)),
        other => panic!("unexpected result {other:?}"),
    }
    assert!(context.module_for_simple_name("D", false)?.is_none());
    Ok(())
}

#[test]
fn same_path_same_module() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "lib", "E.dll", ImageBuilder::assembly("E"));

    let context = CompilationContextBuilder::new()
        .reference_file("E", &path)
        .build()?;

    let first = context.module_from_path(&path)?;
    let second = context.module_from_path(&dir.path().join("lib/../lib/E.dll"))?;
    assert!(Arc::ptr_eq(&first, &second));

    let by_name = context.module_for_simple_name("E", true)?.unwrap();
    assert!(Arc::ptr_eq(&first, &by_name));

    let by_id = context.module_by_id(first.id()).unwrap();
    assert!(Arc::ptr_eq(&first, &by_id));
    Ok(())
}

#[test]
fn netmodules_have_no_version() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = write(dir.path(), "lib", "Part.netmodule", ImageBuilder::netmodule("Part"));

    let context = CompilationContextBuilder::new()
        .input_file("Part", &path)
        .build()?;

    let module = context.module_for_simple_name("Part", true)?.unwrap();
    assert!(!module.is_assembly());

    let request = AssemblyNameRequest::parse("Part, Version=1.0.0.0")?;
    assert!(matches!(
        context.resolve_assembly(&request, true),
        Err(Error::IncompatibleVersion { .. })
    ));
    Ok(())
}
