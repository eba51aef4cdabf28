//! Copying pages between documents
//!
//! Pages are deep-copied from a read-only source into a fresh output
//! document. Each referenced object is copied once; references to pages that
//! are not carried over become `null`.

use crate::constants::INHERITABLE_PAGE_KEYS;
use crate::types::*;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::{HashMap, HashSet};

/// Maximum page-tree depth walked when resolving inherited attributes
const MAX_TREE_DEPTH: usize = 64;

pub(crate) struct PageCopier<'a> {
    source: &'a Document,
    /// Source object id -> output object id
    cache: HashMap<ObjectId, ObjectId>,
    /// Source pages left out of the output
    dropped: HashSet<ObjectId>,
}

impl<'a> PageCopier<'a> {
    pub(crate) fn new(source: &'a Document) -> Self {
        Self {
            source,
            cache: HashMap::new(),
            dropped: HashSet::new(),
        }
    }

    /// Claim `output_id` for a source page before any copying starts, so
    /// links between kept pages resolve to their new ids.
    pub(crate) fn reserve_page(&mut self, page_id: ObjectId, output_id: ObjectId) {
        self.cache.insert(page_id, output_id);
    }

    pub(crate) fn drop_page(&mut self, page_id: ObjectId) {
        self.dropped.insert(page_id);
    }

    /// Copy a source page into its reserved slot under `parent_id`.
    pub(crate) fn copy_page(
        &mut self,
        output: &mut Document,
        page_id: ObjectId,
        output_id: ObjectId,
        parent_id: ObjectId,
    ) -> Result<()> {
        let source = self.source;
        let page_dict = source.get_dictionary(page_id)?;

        let mut new_dict = Dictionary::new();
        for (key, value) in page_dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            new_dict.set(key.clone(), self.copy_object(output, value)?);
        }

        // The output page tree is flat, so inherited attributes move onto the page
        for key in INHERITABLE_PAGE_KEYS {
            if new_dict.has(key) {
                continue;
            }
            if let Some(value) = inherited_attribute(source, page_dict, key) {
                new_dict.set(key.to_vec(), self.copy_object(output, value)?);
            }
        }

        new_dict.set("Parent", Object::Reference(parent_id));
        output.objects.insert(output_id, Object::Dictionary(new_dict));
        Ok(())
    }

    /// Deep copy an object into `output`, following references.
    pub(crate) fn copy_object(&mut self, output: &mut Document, obj: &Object) -> Result<Object> {
        match obj {
            Object::Reference(id) => {
                if self.dropped.contains(id) {
                    return Ok(Object::Null);
                }
                if let Some(&new_id) = self.cache.get(id) {
                    return Ok(Object::Reference(new_id));
                }

                // Dangling references read as null
                let source = self.source;
                let Ok(referenced) = source.get_object(*id) else {
                    return Ok(Object::Null);
                };

                // Register before recursing so cycles terminate
                let new_id = output.new_object_id();
                self.cache.insert(*id, new_id);
                let copied = self.copy_object(output, referenced)?;
                output.objects.insert(new_id, copied);

                Ok(Object::Reference(new_id))
            }
            Object::Dictionary(dict) => Ok(Object::Dictionary(self.copy_dictionary(output, dict)?)),
            Object::Array(arr) => {
                let new_arr: Result<Vec<_>> = arr
                    .iter()
                    .map(|item| self.copy_object(output, item))
                    .collect();
                Ok(Object::Array(new_arr?))
            }
            Object::Stream(stream) => {
                let dict = self.copy_dictionary(output, &stream.dict)?;
                let mut new_stream = Stream::new(dict, stream.content.clone());
                new_stream.allows_compression = stream.allows_compression;
                Ok(Object::Stream(new_stream))
            }
            _ => Ok(obj.clone()),
        }
    }

    fn copy_dictionary(&mut self, output: &mut Document, dict: &Dictionary) -> Result<Dictionary> {
        let mut new_dict = Dictionary::new();
        for (key, value) in dict.iter() {
            new_dict.set(key.clone(), self.copy_object(output, value)?);
        }
        Ok(new_dict)
    }
}

/// Find `key` on the nearest ancestor of `page` in the page tree.
///
/// Only ancestors are consulted; callers check the page itself first.
pub(crate) fn inherited_attribute<'d>(
    doc: &'d Document,
    page: &'d Dictionary,
    key: &[u8],
) -> Option<&'d Object> {
    let mut node = page;
    for _ in 0..MAX_TREE_DEPTH {
        let parent_id = node.get(b"Parent").and_then(|p| p.as_reference()).ok()?;
        node = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
    }
    None
}
