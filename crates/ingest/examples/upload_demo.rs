use catalog::{CatalogConfig, CatalogStore};
use ingest::{decode_form, group_parts, ingest, IngestConfig};

const BODY: &[u8] = b"--demo\r\n\
Content-Disposition: form-data; name=\"book_0\"; filename=\"Middlemarch.epub\"\r\n\
Content-Type: application/epub+zip\r\n\r\n\
PK\x03\x04middlemarch\r\n\
--demo\r\n\
Content-Disposition: form-data; name=\"metadata_0\"\r\n\r\n\
{\"title\":\"Middlemarch\",\"creator\":\"George Eliot\",\"language\":\"en\"}\r\n\
--demo\r\n\
Content-Disposition: form-data; name=\"book_1\"; filename=\"untitled.epub\"\r\n\r\n\
PK\x03\x04untitled\r\n\
--demo--\r\n";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = IngestConfig::default();
    let parts = decode_form(Some("multipart/form-data; boundary=demo"), BODY)?;

    for item in group_parts(parts.clone(), &cfg) {
        println!(
            "#{} {} ({} bytes, metadata: {})",
            item.index,
            item.filename,
            item.content.len(),
            item.metadata.is_some()
        );
    }

    let dir = std::env::temp_dir().join("shelf-upload-demo");
    let store = CatalogStore::open(CatalogConfig::rooted_at(&dir))?;
    for book in ingest(parts, &store, &cfg)? {
        println!("stored {} -> {:?}", book.id, book.title);
    }
    for summary in store.list_books() {
        println!("{summary:#?}");
    }
    Ok(())
}
