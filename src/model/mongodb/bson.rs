use mongodb::bson::{doc, Document};

/// Filter matching the document with the given integer `_id`.
pub fn u32_id_filter(id: u32) -> Document {
    doc! {
        "_id": id,
    }
}

/// Filter matching any document whose integer `_id` is in `ids`.
pub fn u32_ids_filter<'a>(ids: impl IntoIterator<Item = &'a u32>) -> Document {
    let ids: Vec<u32> = ids.into_iter().copied().collect();
    doc! {
        "_id": { "$in": ids },
    }
}
