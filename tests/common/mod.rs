#![allow(dead_code)]

use std::path::Path;

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use page_sequencer::embedding::{Embedder, EmbeddingError};
use page_sequencer::oracle::{Oracle, OracleError};

/// What to draw on one page of a generated test PDF.
pub enum PageSpec<'a> {
    Text(&'a str),
    Blank,
    Rectangle,
}

pub fn write_pdf(path: &Path, pages: &[PageSpec]) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut kids = Vec::new();
    for spec in pages {
        let operations = match spec {
            PageSpec::Text(text) => vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 12.into()]),
                Operation::new("Td", vec![72.into(), 700.into()]),
                Operation::new("Tj", vec![Object::string_literal(*text)]),
                Operation::new("ET", vec![]),
            ],
            PageSpec::Blank => vec![],
            PageSpec::Rectangle => vec![
                Operation::new("re", vec![72.into(), 72.into(), 200.into(), 100.into()]),
                Operation::new("f", vec![]),
            ],
        };
        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).unwrap();
}

/// Returns the vector of the first keyword found in each text, zeros otherwise.
pub struct KeywordEmbedder {
    pub keywords: Vec<(&'static str, Vec<f32>)>,
    pub dimension: usize,
}

impl Embedder for KeywordEmbedder {
    fn embed(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|text| {
                self.keywords
                    .iter()
                    .find(|(keyword, _)| text.contains(keyword))
                    .map(|(_, vector)| vector.clone())
                    .unwrap_or_else(|| vec![0.0; self.dimension])
            })
            .collect())
    }
}

/// Loan cover, Article I and Article II: cover ~ I strongly, I ~ II moderately.
pub fn loan_embedder() -> KeywordEmbedder {
    KeywordEmbedder {
        keywords: vec![
            ("LOAN AGREEMENT", vec![1.0, 0.0, 0.0]),
            ("ARTICLE II", vec![0.0, 1.0, 0.0]),
            ("ARTICLE I", vec![0.8, 0.6, 0.0]),
        ],
        dimension: 3,
    }
}

pub struct FixedOracle(pub String);

impl FixedOracle {
    pub fn boxed(answer: &str) -> Box<dyn Oracle> {
        Box::new(FixedOracle(answer.to_string()))
    }
}

impl Oracle for FixedOracle {
    fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
        Ok(self.0.clone())
    }
}

pub struct FailingOracle;

impl Oracle for FailingOracle {
    fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
        Err(OracleError::HttpStatus(503))
    }
}

pub const ARTICLE_TWO: &str = "ARTICLE II\nThe Loan\nThe Borrower shall repay the principal in full.";
pub const LOAN_COVER: &str = "LOAN AGREEMENT\nBETWEEN ACME CORP AND FIRST NATIONAL BANK\nDated as of the effective date";
pub const ARTICLE_ONE: &str = "ARTICLE I\nDEFINITIONS\nCapitalized terms have the meanings below.";
