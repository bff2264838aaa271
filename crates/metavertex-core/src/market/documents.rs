// Product attachments: validated, scanned, hashed and stored on disk.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use super::Marketplace;
use crate::config::UploadConfig;
use crate::error::{MarketError, MarketResult};
use crate::model::document::{self, Document, ScanResult};
use crate::model::product::Product;
use crate::model::user::Actor;
use crate::model::{new_id, ReviewStatus};

#[derive(Debug, Clone)]
pub struct UploadLimits {
    /// Files live at `<dir>/<product_id>/<document_id>`.
    pub dir: PathBuf,
    pub max_file_size: u64,
    pub max_files: usize,
}

impl From<&UploadConfig> for UploadLimits {
    fn from(config: &UploadConfig) -> Self {
        Self {
            dir: PathBuf::from(&config.dir),
            max_file_size: config.max_file_size_bytes(),
            max_files: config.max_files_per_product,
        }
    }
}

impl UploadLimits {
    fn path_for(&self, doc: &Document) -> PathBuf {
        self.dir.join(&doc.product_id).join(&doc.id)
    }
}

/// Strip any directory components and control characters a client sent
/// along with the name.
fn clean_file_name(name: &str) -> Option<String> {
    let base: String = name
        .rsplit(['/', '\\'])
        .next()?
        .chars()
        .filter(|c| !c.is_control())
        .collect();
    let base = base.trim();
    (!base.is_empty()).then(|| base.to_string())
}

fn may_read(actor: &Actor, product: &Product) -> bool {
    actor.is_admin() || product.founder_id == actor.id || product.status == ReviewStatus::Approved
}

fn may_write(actor: &Actor, product: &Product) -> bool {
    actor.is_admin() || product.founder_id == actor.id
}

impl Marketplace {
    fn load_product(&self, id: &str) -> MarketResult<Product> {
        self.db
            .find_product(id)?
            .ok_or_else(|| MarketError::not_found("Product", id))
    }

    /// Store a file for a product. Only the product's founder may upload.
    pub async fn upload_document(
        &self,
        actor: &Actor,
        product_id: &str,
        name: &str,
        bytes: &[u8],
    ) -> MarketResult<Document> {
        let product = self.load_product(product_id)?;
        if product.founder_id != actor.id {
            return Err(MarketError::Forbidden(
                "Only the product's founder can upload documents".into(),
            ));
        }

        let name = clean_file_name(name).ok_or_else(|| MarketError::invalid("File name is required"))?;
        let mut errors = Vec::new();
        if !document::is_accepted(&name) {
            errors.push(format!("File type not allowed: {name}"));
        }
        if bytes.len() as u64 > self.uploads.max_file_size {
            errors.push(format!(
                "{name} exceeds the maximum size of {} bytes",
                self.uploads.max_file_size
            ));
        }
        if self.db.list_documents(&product.id)?.len() >= self.uploads.max_files {
            errors.push(too_many_documents_message(self.uploads.max_files));
        }
        if !errors.is_empty() {
            return Err(MarketError::Invalid(errors));
        }

        let scan = document::scan(bytes);
        if scan == ScanResult::Threat {
            warn!(
                "refused upload {name} for product {} from {}: failed security scan",
                product.id, actor.unique_id
            );
            return Err(MarketError::invalid(format!(
                "{name} failed the security scan"
            )));
        }

        let doc = Document {
            id: new_id(),
            product_id: product.id.clone(),
            uploader_id: actor.id.clone(),
            content_type: document::content_type_for(&name).to_string(),
            name,
            size: bytes.len() as u64,
            sha256: format!("{:x}", Sha256::digest(bytes)),
            scan,
            uploaded_at: Utc::now(),
        };

        // Claim the slot before touching the disk; a refused row leaves no file.
        if !self.db.insert_document(&doc, self.uploads.max_files)? {
            return Err(too_many_documents(self.uploads.max_files));
        }
        let path = self.uploads.path_for(&doc);
        if let Err(e) = write_file(&path, bytes).await {
            if let Err(cleanup) = self.db.delete_document(&doc.id) {
                warn!("failed to drop row for unwritten document {}: {cleanup:#}", doc.id);
            }
            return Err(e);
        }

        info!(
            "stored {} ({} bytes) for product {}",
            doc.name, doc.size, doc.product_id
        );
        Ok(doc)
    }

    /// Documents are readable by the founder, admins, and anyone once the
    /// product is approved.
    pub fn list_documents(&self, actor: &Actor, product_id: &str) -> MarketResult<Vec<Document>> {
        let product = self.load_product(product_id)?;
        if !may_read(actor, &product) {
            return Err(MarketError::not_found("Product", product_id));
        }
        Ok(self.db.list_documents(&product.id)?)
    }

    pub async fn read_document(&self, actor: &Actor, id: &str) -> MarketResult<(Document, Vec<u8>)> {
        let doc = self
            .db
            .find_document(id)?
            .ok_or_else(|| MarketError::not_found("Document", id))?;
        let product = self.load_product(&doc.product_id)?;
        if !may_read(actor, &product) {
            return Err(MarketError::not_found("Document", id));
        }
        let path = self.uploads.path_for(&doc);
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok((doc, bytes))
    }

    pub async fn delete_document(&self, actor: &Actor, id: &str) -> MarketResult<()> {
        let doc = self
            .db
            .find_document(id)?
            .ok_or_else(|| MarketError::not_found("Document", id))?;
        let product = self.load_product(&doc.product_id)?;
        if !may_write(actor, &product) {
            return Err(if may_read(actor, &product) {
                MarketError::Forbidden("Only the founder or an admin can delete documents".into())
            } else {
                MarketError::not_found("Document", id)
            });
        }

        self.db.delete_document(&doc.id)?;
        let path = self.uploads.path_for(&doc);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("document {} had no file at {}", doc.id, path.display());
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("failed to remove {}", path.display()))
                    .into())
            }
        }
        if actor.is_admin() {
            self.audit(
                actor,
                "document_deleted",
                Some(&doc.id),
                serde_json::json!({ "productId": doc.product_id, "name": doc.name }),
            )?;
        }
        Ok(())
    }
}

fn too_many_documents_message(max: usize) -> String {
    format!("A product can have at most {max} documents")
}

fn too_many_documents(max: usize) -> MarketError {
    MarketError::Invalid(vec![too_many_documents_message(max)])
}

async fn write_file(path: &Path, bytes: &[u8]) -> MarketResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::testing::fixture;
    use crate::model::user::UserType;

    const PDF: &[u8] = b"%PDF-1.7\nhello";

    #[tokio::test]
    async fn founder_uploads_and_visitors_download() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Hydro", true);

        let doc = fx
            .market
            .upload_document(&founder, &product.id, "decks/pitch.pdf", PDF)
            .await
            .unwrap();
        assert_eq!(doc.name, "pitch.pdf");
        assert_eq!(doc.content_type, "application/pdf");
        assert_eq!(doc.scan, ScanResult::Clean);
        assert_eq!(doc.sha256.len(), 64);
        assert!(fx.upload_dir.join(&product.id).join(&doc.id).exists());

        let listed = fx.market.list_documents(&investor, &product.id).unwrap();
        assert_eq!(listed.len(), 1);
        let (_, bytes) = fx.market.read_document(&investor, &doc.id).await.unwrap();
        assert_eq!(bytes, PDF);
    }

    #[tokio::test]
    async fn only_the_founder_may_upload() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Hydro", true);

        for actor in [&investor, &fx.admin] {
            assert!(matches!(
                fx.market
                    .upload_document(actor, &product.id, "pitch.pdf", PDF)
                    .await,
                Err(MarketError::Forbidden(_))
            ));
        }
    }

    #[tokio::test]
    async fn type_size_and_count_limits_apply() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let product = fx.product(&founder, "Hydro", false);

        assert!(matches!(
            fx.market
                .upload_document(&founder, &product.id, "setup.exe", b"data")
                .await,
            Err(MarketError::Invalid(_))
        ));
        let too_big = vec![b'a'; 2048];
        assert!(matches!(
            fx.market
                .upload_document(&founder, &product.id, "notes.txt", &too_big)
                .await,
            Err(MarketError::Invalid(_))
        ));

        for name in ["a.pdf", "b.pdf"] {
            fx.market
                .upload_document(&founder, &product.id, name, PDF)
                .await
                .unwrap();
        }
        match fx
            .market
            .upload_document(&founder, &product.id, "c.pdf", PDF)
            .await
        {
            Err(MarketError::Invalid(errors)) => {
                assert_eq!(errors, vec!["A product can have at most 2 documents"])
            }
            other => panic!("expected count limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn concurrent_uploads_respect_the_count_limit() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let product = fx.product(&founder, "Hydro", false);

        let (a, b, c) = tokio::join!(
            fx.market.upload_document(&founder, &product.id, "a.pdf", PDF),
            fx.market.upload_document(&founder, &product.id, "b.pdf", PDF),
            fx.market.upload_document(&founder, &product.id, "c.pdf", PDF),
        );
        let stored = [a, b, c].into_iter().filter(|r| r.is_ok()).count();
        assert_eq!(stored, 2);

        let listed = fx.market.list_documents(&founder, &product.id).unwrap();
        assert_eq!(listed.len(), 2);
        let files = std::fs::read_dir(fx.upload_dir.join(&product.id))
            .unwrap()
            .count();
        assert_eq!(files, 2);
    }

    #[tokio::test]
    async fn executables_are_refused_and_not_stored() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let product = fx.product(&founder, "Hydro", false);

        assert!(matches!(
            fx.market
                .upload_document(&founder, &product.id, "invoice.pdf", b"MZ\x90\x00")
                .await,
            Err(MarketError::Invalid(_))
        ));
        assert!(fx
            .market
            .list_documents(&founder, &product.id)
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn unapproved_product_documents_are_private() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Hydro", false);
        let doc = fx
            .market
            .upload_document(&founder, &product.id, "pitch.pdf", PDF)
            .await
            .unwrap();

        assert!(matches!(
            fx.market.list_documents(&investor, &product.id),
            Err(MarketError::NotFound(_))
        ));
        assert!(fx.market.read_document(&fx.admin, &doc.id).await.is_ok());
    }

    #[tokio::test]
    async fn delete_removes_row_and_file() {
        let fx = fixture();
        let founder = fx.member("f@example.com", UserType::Founder);
        let investor = fx.member("i@example.com", UserType::Investor);
        let product = fx.product(&founder, "Hydro", true);
        let doc = fx
            .market
            .upload_document(&founder, &product.id, "pitch.pdf", PDF)
            .await
            .unwrap();

        assert!(matches!(
            fx.market.delete_document(&investor, &doc.id).await,
            Err(MarketError::Forbidden(_))
        ));
        fx.market.delete_document(&founder, &doc.id).await.unwrap();
        assert!(!fx.upload_dir.join(&product.id).join(&doc.id).exists());
        assert!(matches!(
            fx.market.read_document(&founder, &doc.id).await,
            Err(MarketError::NotFound(_))
        ));
    }

    #[test]
    fn client_paths_are_stripped() {
        assert_eq!(clean_file_name("../../etc/passwd.txt").as_deref(), Some("passwd.txt"));
        assert_eq!(clean_file_name(r"C:\tmp\deck.pptx").as_deref(), Some("deck.pptx"));
        assert_eq!(clean_file_name("dir/"), None);
        assert_eq!(clean_file_name("deck\r\n.pdf").as_deref(), Some("deck.pdf"));
    }
}
