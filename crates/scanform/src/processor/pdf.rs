use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::ProcessError;

/// Turns PDF bytes into per-page raster images.
pub trait PageRasterizer: Send + Sync {
    /// Prepares one PDF for rendering. Called once per document.
    fn open<'a>(&'a self, pdf: &[u8]) -> Result<Box<dyn RasterPages + 'a>, ProcessError>;
}

/// An opened PDF whose pages are rendered one at a time.
pub trait RasterPages {
    fn page_count(&self) -> usize;

    /// Renders one page (1-based) to encoded image bytes.
    fn render_page(&self, page: u32, dpi: u32) -> Result<Vec<u8>, ProcessError>;
}

/// Rasterizer backed by poppler-utils (`pdfinfo`, `pdftoppm`).
///
/// The PDF is written to a temp file once and every page renders from it.
/// Page counting prefers lopdf and only shells out when lopdf cannot parse
/// the file.
#[derive(Debug, Default, Clone, Copy)]
pub struct PopplerRasterizer;

impl PageRasterizer for PopplerRasterizer {
    fn open<'a>(&'a self, pdf: &[u8]) -> Result<Box<dyn RasterPages + 'a>, ProcessError> {
        let temp = TempPdf::write(pdf, "render")?;
        let pages = match lopdf::Document::load_mem(pdf) {
            Ok(doc) => doc.get_pages().len(),
            Err(e) => {
                tracing::warn!("lopdf failed to parse PDF: {}. Falling back to pdfinfo.", e);
                count_pdf_pages(temp.path())?
            }
        };
        Ok(Box::new(PopplerPages { temp, pages }))
    }
}

struct PopplerPages {
    temp: TempPdf,
    pages: usize,
}

impl RasterPages for PopplerPages {
    fn page_count(&self) -> usize {
        self.pages
    }

    fn render_page(&self, page: u32, dpi: u32) -> Result<Vec<u8>, ProcessError> {
        render_pdf_page_to_image(self.temp.path(), page, dpi)
    }
}

/// Temp copy of the PDF, removed on drop.
struct TempPdf {
    path: PathBuf,
}

impl TempPdf {
    fn write(pdf_bytes: &[u8], purpose: &str) -> Result<Self, ProcessError> {
        let path = std::env::temp_dir().join(format!(
            "scanform_{}_{}.pdf",
            purpose,
            uuid::Uuid::new_v4()
        ));
        std::fs::write(&path, pdf_bytes)
            .map_err(|e| ProcessError::PdfProcessing(format!("Failed to write temp PDF: {}", e)))?;
        Ok(Self { path })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempPdf {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Get the page count of a PDF using pdfinfo (poppler-utils).
fn count_pdf_pages(pdf_path: &Path) -> Result<usize, ProcessError> {
    let output = Command::new("pdfinfo")
        .arg(pdf_path)
        .output()
        .map_err(|e| {
            ProcessError::PdfProcessing(format!(
                "Failed to run pdfinfo: {}. Make sure poppler-utils is installed.",
                e
            ))
        })?;

    if !output.status.success() {
        return Err(ProcessError::PdfProcessing(format!(
            "pdfinfo failed: {}",
            String::from_utf8_lossy(&output.stderr)
        )));
    }

    parse_pdfinfo_pages(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
        ProcessError::PdfProcessing("pdfinfo output has no page count".to_string())
    })
}

fn parse_pdfinfo_pages(stdout: &str) -> Option<usize> {
    stdout
        .lines()
        .filter_map(|line| line.strip_prefix("Pages:"))
        .find_map(|count| count.trim().parse::<usize>().ok())
}

/// `-singlefile` drops the page-number suffix, so the output name does not
/// depend on the page count.
fn single_page_output(prefix: &Path) -> PathBuf {
    PathBuf::from(format!("{}.png", prefix.display()))
}

fn render_pdf_page_to_image(pdf_path: &Path, page: u32, dpi: u32) -> Result<Vec<u8>, ProcessError> {
    let output_prefix =
        std::env::temp_dir().join(format!("scanform_page_{}", uuid::Uuid::new_v4()));

    let output = Command::new("pdftoppm")
        .arg("-png")
        .arg("-singlefile")
        .arg("-r")
        .arg(dpi.to_string())
        .arg("-f")
        .arg(page.to_string())
        .arg("-l")
        .arg(page.to_string())
        .arg(pdf_path)
        .arg(&output_prefix)
        .output()
        .map_err(|e| ProcessError::PageRender {
            page,
            reason: format!(
                "failed to run pdftoppm: {}. Make sure poppler-utils is installed.",
                e
            ),
        })?;

    if !output.status.success() {
        return Err(ProcessError::PageRender {
            page,
            reason: format!(
                "pdftoppm failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ),
        });
    }

    let image_path = single_page_output(&output_prefix);
    let image_data = std::fs::read(&image_path).map_err(|e| ProcessError::PageRender {
        page,
        reason: format!("failed to read rendered image: {}", e),
    });
    let _ = std::fs::remove_file(&image_path);

    image_data
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Document, Object};

    fn blank_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let kids: Vec<Object> = (0..pages)
            .map(|_| {
                doc.add_object(dictionary! {
                    "Type" => "Page",
                    "Parent" => pages_id,
                    "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
                })
                .into()
            })
            .collect();

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => pages as i64,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut pdf_bytes = Vec::new();
        doc.save_to(&mut pdf_bytes).unwrap();
        pdf_bytes
    }

    #[test]
    fn test_page_count_from_lopdf() {
        assert_eq!(PopplerRasterizer.open(&blank_pdf(1)).unwrap().page_count(), 1);
        assert_eq!(PopplerRasterizer.open(&blank_pdf(3)).unwrap().page_count(), 3);
    }

    #[test]
    fn test_single_page_output_has_no_page_suffix() {
        let prefix = Path::new("/tmp/scanform_page_x");
        assert_eq!(
            single_page_output(prefix),
            PathBuf::from("/tmp/scanform_page_x.png")
        );
    }

    #[test]
    fn test_parse_pdfinfo_pages() {
        let stdout = "Title:          scan\nProducer:       x\nPages:          12\nEncrypted:      no\n";
        assert_eq!(parse_pdfinfo_pages(stdout), Some(12));
        assert_eq!(parse_pdfinfo_pages("Title: nothing\n"), None);
    }

    #[test]
    fn test_temp_pdf_removed_on_drop() {
        let path = {
            let temp = TempPdf::write(b"%PDF-1.5", "test").unwrap();
            assert!(temp.path().exists());
            temp.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
