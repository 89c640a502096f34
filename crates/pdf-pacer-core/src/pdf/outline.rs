use mupdf::{Document as MuDocument, Outline};
use tracing::debug;

use crate::error::{Error, Result};
use crate::toc::OutlineNode;

/// Read the bookmark tree; targets outside the document are dropped to `None`
pub(crate) fn read_outline(doc: &MuDocument, page_count: usize) -> Result<Vec<OutlineNode>> {
    let outlines = doc
        .outlines()
        .map_err(|e| Error::PdfOutline(e.to_string()))?;
    let nodes = convert(&outlines, page_count);
    debug!("Read {} top-level outline entries", nodes.len());
    Ok(nodes)
}

fn convert(outlines: &[Outline], page_count: usize) -> Vec<OutlineNode> {
    outlines
        .iter()
        .map(|outline| {
            let page = outline
                .page
                .and_then(|page| usize::try_from(page).ok())
                .filter(|&page| page < page_count);
            OutlineNode::new(outline.title.trim(), page)
                .with_children(convert(&outline.down, page_count))
        })
        .collect()
}
