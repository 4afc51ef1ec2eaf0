use lopdf::Document;

/// Extract the text of every page, in page order, separated by blank lines.
pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, lopdf::Error> {
    let document = Document::load_mem(bytes)?;

    let mut pages = Vec::new();
    for page_number in document.get_pages().keys() {
        pages.push(document.extract_text(&[*page_number])?);
    }

    Ok(join_pages(pages))
}

pub(crate) fn join_pages<I>(pages: I) -> String
where
    I: IntoIterator<Item = String>,
{
    let mut text = String::new();
    for page in pages {
        text.push_str(page.trim_end());
        text.push_str("\n\n");
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    fn pdf_with_pages(texts: &[&str]) -> Vec<u8> {
        let mut document = Document::with_version("1.5");
        let pages_id = document.new_object_id();
        let font_id = document.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = document.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids: Vec<Object> = Vec::new();
        for text in texts {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 24.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                document.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = document.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        document.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = document.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        document.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        document.save_to(&mut bytes).unwrap();
        bytes
    }

    #[test]
    fn pages_are_extracted_in_order() {
        let bytes = pdf_with_pages(&["Hello first", "Second page"]);
        assert_eq!(extract_pdf_text(&bytes).unwrap(), "Hello first\n\nSecond page");
    }

    #[test]
    fn pages_are_joined_with_blank_lines() {
        let pages = vec!["First page\n".to_string(), "Second page  ".to_string()];
        assert_eq!(join_pages(pages), "First page\n\nSecond page");
    }

    #[test]
    fn empty_document_text_is_empty() {
        assert_eq!(join_pages(Vec::new()), "");
    }

    #[test]
    fn garbage_bytes_are_an_error() {
        assert!(extract_pdf_text(b"definitely not a pdf").is_err());
    }
}
