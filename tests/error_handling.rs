use shelf::{
    CatalogError, IngestConfig, IngestError, decode_form, open_library,
    upload_books,
};
use tempfile::TempDir;

const CONTENT_TYPE: &str = "multipart/form-data; boundary=q";

#[test]
fn corrupt_snapshot_starts_empty_and_is_kept_aside() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("books_data.json"), b"{\"books\": {\"trunc").unwrap();

    let store = open_library(dir.path()).unwrap();
    assert_eq!(store.stats().books_count, 0);
    assert!(dir.path().join("books_data.json.corrupt").exists());

    assert!(store.save());
    let reopened = open_library(dir.path()).unwrap();
    assert_eq!(reopened.stats().books_count, 0);
}

#[test]
fn missing_snapshot_is_an_empty_library() {
    let dir = TempDir::new().unwrap();
    let store = open_library(dir.path()).unwrap();
    assert!(store.list_books().is_empty());
    assert!(!dir.path().join("books_data.json").exists());
}

#[test]
fn content_type_without_boundary_is_malformed() {
    for content_type in [None, Some("multipart/form-data"), Some("application/json")] {
        let err = decode_form(content_type, b"--q\r\n\r\n--q--").unwrap_err();
        assert!(
            matches!(err, IngestError::MalformedRequest(_)),
            "{content_type:?} gave {err:?}"
        );
    }
}

#[test]
fn body_without_boundary_is_malformed() {
    let err = decode_form(Some(CONTENT_TYPE), b"no delimiter anywhere").unwrap_err();
    assert!(matches!(err, IngestError::MalformedRequest(_)));
}

#[test]
fn upload_without_epub_leaves_catalog_untouched() {
    let dir = TempDir::new().unwrap();
    let store = open_library(dir.path()).unwrap();
    let body = b"--q\r\n\
Content-Disposition: form-data; name=\"file\"; filename=\"notes.pdf\"\r\n\r\n\
%PDF\r\n\
--q--\r\n";

    let err = upload_books(Some(CONTENT_TYPE), body, &store, &IngestConfig::default()).unwrap_err();
    assert_eq!(err, IngestError::NoFilesUploaded);
    assert_eq!(store.stats().books_count, 0);
    assert!(!dir.path().join("books_data.json").exists());
}

#[test]
fn upload_limit_is_enforced() {
    let dir = TempDir::new().unwrap();
    let store = open_library(dir.path()).unwrap();
    let cfg = IngestConfig {
        max_files_per_upload: Some(1),
        ..IngestConfig::default()
    };
    let body = b"--q\r\n\
Content-Disposition: form-data; name=\"a\"; filename=\"a.epub\"\r\n\r\n\
a\r\n\
--q\r\n\
Content-Disposition: form-data; name=\"b\"; filename=\"b.epub\"\r\n\r\n\
b\r\n\
--q--\r\n";

    let err = upload_books(Some(CONTENT_TYPE), body, &store, &cfg).unwrap_err();
    assert_eq!(err, IngestError::TooManyFiles { count: 2, limit: 1 });
}

#[test]
fn cover_for_unknown_book_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = open_library(dir.path()).unwrap();
    let err = store.store_cover("book_00000000_00000000", b"jpeg").unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(_)));
}

#[test]
fn unwritable_blob_directory_fails_the_upload() {
    let dir = TempDir::new().unwrap();
    let store = open_library(dir.path()).unwrap();
    // Replace the books directory with a plain file so blob writes fail.
    let books_dir = &store.config().books_dir;
    std::fs::remove_dir(books_dir).unwrap();
    std::fs::write(books_dir, b"not a directory").unwrap();

    let body = b"--q\r\n\
Content-Disposition: form-data; name=\"a\"; filename=\"a.epub\"\r\n\r\n\
a\r\n\
--q--\r\n";
    let err = upload_books(Some(CONTENT_TYPE), body, &store, &IngestConfig::default()).unwrap_err();
    assert!(matches!(err, IngestError::Catalog(CatalogError::Persistence(_))));
    assert_eq!(store.stats().books_count, 0);
}
