#![forbid(unsafe_code)]

use purple_dom::{Dom, DomError};

/// Return `<head>`, creating it before `<body>` when the parser has not
/// produced one yet.
pub fn ensure_head<D: Dom>(dom: &mut D) -> Result<D::Node, DomError> {
    if let Some(head) = dom.head() {
        return Ok(head);
    }
    let html = dom.document_element().ok_or(DomError::MissingNode)?;
    let head = dom.create_element("head")?;
    let body = dom.body();
    dom.insert_before(&html, &head, body.as_ref())?;
    Ok(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use purple_dom::MemoryDom;

    #[test]
    fn existing_head_is_reused() {
        let mut dom = MemoryDom::new();
        let head = dom.head().unwrap();
        assert_eq!(ensure_head(&mut dom).unwrap(), head);
        assert!(dom.take_changes().is_empty());
    }

    #[test]
    fn missing_head_is_created_before_body() {
        let mut dom = MemoryDom::bare();
        let root = dom.root();
        let body = dom.append_element(root, "body").unwrap();
        let head = ensure_head(&mut dom).unwrap();
        assert_eq!(dom.children(root), vec![head, body]);
    }

    #[test]
    fn bare_document_gets_head() {
        let mut dom = MemoryDom::bare();
        let head = ensure_head(&mut dom).unwrap();
        assert_eq!(dom.head(), Some(head));
    }
}
