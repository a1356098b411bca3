use natpack_schema::{Arch, BuildInfo, Os, Platform};
use natpack_store::{
    bundle_file_name, check_installation, BundleLocator, InstallLayout, LocalBundleLocator,
    StoreError,
};
use std::fs;
use std::path::Path;

const PLATFORM: Platform = Platform::new(Os::Linux, Arch::Amd64);

fn write_bundle(path: &Path, files: &[(&str, &[u8])]) {
    let enc = flate2::write::GzEncoder::new(
        fs::File::create(path).unwrap(),
        flate2::Compression::fast(),
    );
    let mut builder = tar::Builder::new(enc);
    for (name, data) in files {
        let mut h = tar::Header::new_gnu();
        h.set_size(data.len() as u64);
        h.set_mode(0o755);
        h.set_cksum();
        builder.append_data(&mut h, name, *data).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

fn install_from_shipped(ship_dir: &Path, install_dir: &Path, info: &BuildInfo) {
    let layout = InstallLayout::new(install_dir);
    layout.reset().unwrap();
    let locator = LocalBundleLocator::new(vec![ship_dir.to_path_buf()], "jcef-natives");
    let stream = locator.locate(info, PLATFORM).unwrap().expect("shipped bundle");
    natpack_store::extract_tar_gz(stream, layout.root()).unwrap();
    layout.ensure_build_meta(info).unwrap();
    layout.write_marker().unwrap();
}

#[test]
fn shipped_bundle_installs_and_checks_valid() {
    let ship = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let install_dir = target.path().join("bundle");
    let info = BuildInfo::new("r100");
    write_bundle(
        &ship.path().join(bundle_file_name("jcef-natives", PLATFORM, &info)),
        &[("libcef.so", b"native"), ("jcef_helper", b"helper")],
    );

    assert!(!check_installation(&install_dir, &info));
    install_from_shipped(ship.path(), &install_dir, &info);
    assert!(check_installation(&install_dir, &info));
    assert!(install_dir.join("libcef.so").is_file());
    assert!(!check_installation(&install_dir, &BuildInfo::new("r101")));
}

#[test]
fn unmarked_leftovers_are_wiped_on_reinstall() {
    let ship = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let install_dir = target.path().join("bundle");
    let info = BuildInfo::new("r1");
    write_bundle(
        &ship.path().join(bundle_file_name("jcef-natives", PLATFORM, &info)),
        &[("libcef.so", b"native")],
    );

    fs::create_dir_all(&install_dir).unwrap();
    fs::write(install_dir.join("half-written.pak"), b"partial").unwrap();
    info.write_to_dir(&install_dir).unwrap();
    assert!(!check_installation(&install_dir, &info));

    install_from_shipped(ship.path(), &install_dir, &info);
    assert!(!install_dir.join("half-written.pak").exists());
    assert!(check_installation(&install_dir, &info));
}

#[test]
fn traversal_in_shipped_bundle_writes_nothing_outside() {
    let target = tempfile::tempdir().unwrap();
    let install_dir = target.path().join("bundle");
    let layout = InstallLayout::new(&install_dir);
    layout.reset().unwrap();

    let enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    let mut builder = tar::Builder::new(enc);
    let mut h = tar::Header::new_gnu();
    h.set_size(5);
    h.set_mode(0o644);
    let name = b"../outside.txt";
    h.as_old_mut().name[..name.len()].copy_from_slice(name);
    h.set_cksum();
    builder.append(&h, &b"pwned"[..]).unwrap();
    let data = builder.into_inner().unwrap().finish().unwrap();

    let err = natpack_store::extract_tar_gz(data.as_slice(), &install_dir).unwrap_err();
    assert!(matches!(err, StoreError::PathTraversal { .. }));
    assert!(!target.path().join("outside.txt").exists());
    assert!(!layout.is_marked());
}
