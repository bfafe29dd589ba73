use dbox_cli::local::{collect_files, MAX_FILE_LIMIT};
use std::path::PathBuf;

#[test]
fn folder_files_are_sorted_and_relative() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    std::fs::create_dir_all(root.join("b/c")).unwrap();
    std::fs::write(root.join("z.txt"), b"z").unwrap();
    std::fs::write(root.join("a.txt"), b"a").unwrap();
    std::fs::write(root.join("b/c/deep.txt"), b"d").unwrap();

    let files = collect_files(root, MAX_FILE_LIMIT).unwrap();
    let rel: Vec<String> = files.iter().map(|f| f.remote_suffix()).collect();
    assert_eq!(rel, vec!["a.txt", "b/c/deep.txt", "z.txt"]);
    assert_eq!(files[1].path, root.join("b/c/deep.txt"));
}

#[test]
fn single_file_is_its_own_entry() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("one.bin");
    std::fs::write(&file, b"1").unwrap();

    let files = collect_files(&file, MAX_FILE_LIMIT).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].path, file);
    assert_eq!(files[0].relative, PathBuf::from("one.bin"));
}

#[test]
fn limit_caps_the_walk() {
    let dir = tempfile::tempdir().unwrap();
    for i in 0..5 {
        std::fs::write(dir.path().join(format!("f{}", i)), b"x").unwrap();
    }
    assert_eq!(collect_files(dir.path(), 3).unwrap().len(), 3);
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = collect_files(&dir.path().join("nope"), MAX_FILE_LIMIT).unwrap_err();
    assert!(err.to_string().contains("cannot access"));
}
