//! DEX annotation structures and the string-harvesting pass over them.
//!
//! Annotation payloads reference the string table for element names and
//! string values. Those strings are metadata rather than program literals, so
//! [`collect_annotation_strings`] gathers their indices for exclusion from
//! constant-string dumps.

use std::collections::HashSet;

use crate::dex::cursor::{Cursor, ReadStruct};
use crate::dex::encoded_values::{EncodedAnnotation, EncodedValue};
use crate::dex::error::DexError;

/// annotation_item
/// https://source.android.com/docs/core/runtime/dex-format#annotation-item
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationItem {
    /// Visibility: 0x00 = build, 0x01 = runtime, 0x02 = system
    pub visibility: u8,
    pub annotation: EncodedAnnotation,
}

impl AnnotationItem {
    pub fn read(cursor: &mut Cursor<'_>) -> Result<AnnotationItem, DexError> {
        let visibility = cursor.read_u8()?;
        let annotation = EncodedAnnotation::read(cursor)?;
        Ok(AnnotationItem { visibility, annotation })
    }
}

/// A `u32` count followed by that many `u32` offsets. Both
/// `annotation_set_item` and `annotation_set_ref_list` have this shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetList {
    pub offsets: Vec<u32>,
}

impl OffsetList {
    pub fn read(cursor: &mut Cursor<'_>) -> Result<OffsetList, DexError> {
        let size = cursor.read_u32()? as usize;
        cursor.check_count(size, 4)?;
        let mut offsets = Vec::with_capacity(size);
        for _ in 0..size {
            offsets.push(cursor.read_u32()?);
        }
        Ok(OffsetList { offsets })
    }
}

/// field_annotations_item, method_annotations_item and parameter_annotations_item
/// all pair a table index with an offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberAnnotations {
    pub member_idx: u32,
    pub annotations_off: u32,
}

impl ReadStruct for MemberAnnotations {
    const SIZE: usize = 8;

    fn read(cursor: &mut Cursor<'_>) -> Result<Self, DexError> {
        Ok(MemberAnnotations {
            member_idx: cursor.read_u32()?,
            annotations_off: cursor.read_u32()?,
        })
    }
}

/// annotations_directory_item
/// https://source.android.com/docs/core/runtime/dex-format#annotations-directory-item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationsDirectoryItem {
    /// Offset to the class `annotation_set_item` (or 0 if none)
    pub class_annotations_off: u32,
    /// Each points at an `annotation_set_item`.
    pub field_annotations: Vec<MemberAnnotations>,
    /// Each points at an `annotation_set_item`.
    pub method_annotations: Vec<MemberAnnotations>,
    /// Each points at an `annotation_set_ref_list`.
    pub parameter_annotations: Vec<MemberAnnotations>,
}

impl AnnotationsDirectoryItem {
    pub fn read(cursor: &mut Cursor<'_>) -> Result<AnnotationsDirectoryItem, DexError> {
        let class_annotations_off = cursor.read_u32()?;
        let fields_size = cursor.read_u32()? as usize;
        let annotated_methods_size = cursor.read_u32()? as usize;
        let annotated_parameters_size = cursor.read_u32()? as usize;

        Ok(AnnotationsDirectoryItem {
            class_annotations_off,
            field_annotations: cursor.read_structs(fields_size)?,
            method_annotations: cursor.read_structs(annotated_methods_size)?,
            parameter_annotations: cursor.read_structs(annotated_parameters_size)?,
        })
    }
}

/// Walk the annotations directory at `directory_off` and record every string
/// index used as an element name or a string value, at any nesting depth.
pub fn collect_annotation_strings(
    cursor: &mut Cursor<'_>,
    directory_off: u32,
    out: &mut HashSet<u32>,
) -> Result<(), DexError> {
    if directory_off == 0 {
        return Ok(());
    }
    cursor.seek(directory_off as usize)?;
    let directory = AnnotationsDirectoryItem::read(cursor)
        .map_err(|e| DexError::with_context(e, format!("annotations directory at 0x{:x}", directory_off)))?;

    for entry in directory.field_annotations.iter().chain(&directory.method_annotations) {
        visit_annotation_set(cursor, entry.annotations_off, out)
            .map_err(|e| DexError::with_context(e, format!("annotations of member #{}", entry.member_idx)))?;
    }

    for entry in &directory.parameter_annotations {
        if entry.annotations_off == 0 {
            continue;
        }
        cursor.seek(entry.annotations_off as usize)?;
        let ref_list = OffsetList::read(cursor)?;
        for set_off in ref_list.offsets {
            visit_annotation_set(cursor, set_off, out)
                .map_err(|e| DexError::with_context(e, format!("parameter annotations of method #{}", entry.member_idx)))?;
        }
    }

    visit_annotation_set(cursor, directory.class_annotations_off, out)
        .map_err(|e| DexError::with_context(e, "class annotations"))
}

fn visit_annotation_set(cursor: &mut Cursor<'_>, set_off: u32, out: &mut HashSet<u32>) -> Result<(), DexError> {
    if set_off == 0 {
        return Ok(());
    }
    cursor.seek(set_off as usize)?;
    let set = OffsetList::read(cursor)?;
    for item_off in set.offsets {
        if item_off == 0 {
            continue;
        }
        cursor.seek(item_off as usize)?;
        let item = AnnotationItem::read(cursor)?;
        visit_annotation(&item.annotation, out);
    }
    Ok(())
}

fn visit_annotation(annotation: &EncodedAnnotation, out: &mut HashSet<u32>) {
    for element in &annotation.elements {
        out.insert(element.name_idx);
        visit_value(&element.value, out);
    }
}

fn visit_value(value: &EncodedValue, out: &mut HashSet<u32>) {
    match value {
        EncodedValue::String(idx) => {
            out.insert(*idx);
        }
        EncodedValue::Array(values) => values.iter().for_each(|v| visit_value(v, out)),
        EncodedValue::Annotation(nested) => visit_annotation(nested, out),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u32s(buf: &mut Vec<u8>, values: &[u32]) {
        for v in values {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }

    #[test]
    fn reads_directory_tables() {
        let mut buf = vec![];
        u32s(&mut buf, &[0x40, 1, 1, 0, 7, 0x50, 9, 0x60]);
        let mut c = Cursor::new(&buf);
        let dir = AnnotationsDirectoryItem::read(&mut c).unwrap();
        assert_eq!(dir.class_annotations_off, 0x40);
        assert_eq!(dir.field_annotations, vec![MemberAnnotations { member_idx: 7, annotations_off: 0x50 }]);
        assert_eq!(dir.method_annotations, vec![MemberAnnotations { member_idx: 9, annotations_off: 0x60 }]);
        assert!(dir.parameter_annotations.is_empty());
    }

    #[test]
    fn harvests_names_and_nested_strings() {
        // Layout:
        // 0x60 directory: class set @0x20, 0 fields, 0 methods, 1 parameter table (method 4 -> ref list @0x30)
        // 0x20 class set: 1 item @0x40
        // 0x30 ref list: 1 set @0x38
        // 0x38 set: 1 item @0x50
        // 0x40 item: visibility 1, type 2, 1 element name 5 = array [string 6, annotation{name 8 = string 9}]
        // 0x50 item: visibility 0, type 3, 1 element name 10 = int 1
        let mut buf = vec![0u8; 0x78];
        let put = |buf: &mut Vec<u8>, at: usize, bytes: &[u8]| buf[at..at + bytes.len()].copy_from_slice(bytes);
        let mut dir = vec![];
        u32s(&mut dir, &[0x20, 0, 0, 1, 4, 0x30]);
        put(&mut buf, 0x60, &dir);
        let mut set = vec![];
        u32s(&mut set, &[1, 0x40]);
        put(&mut buf, 0x20, &set);
        let mut refs = vec![];
        u32s(&mut refs, &[1, 0x38]);
        put(&mut buf, 0x30, &refs);
        let mut set2 = vec![];
        u32s(&mut set2, &[1, 0x50]);
        put(&mut buf, 0x38, &set2);
        put(&mut buf, 0x40, &[0x01, 0x02, 0x01, 0x05, 0x1C, 0x02, 0x17, 0x06, 0x1D, 0x00, 0x01, 0x08, 0x17, 0x09]);
        put(&mut buf, 0x50, &[0x00, 0x03, 0x01, 0x0A, 0x04, 0x01]);

        let mut c = Cursor::new(&buf);
        let mut out = HashSet::new();
        collect_annotation_strings(&mut c, 0x60, &mut out).unwrap();
        let mut got: Vec<u32> = out.into_iter().collect();
        got.sort();
        assert_eq!(got, vec![5, 6, 8, 9, 10]);
    }

    #[test]
    fn zero_offset_is_no_directory() {
        let mut c = Cursor::new(&[]);
        let mut out = HashSet::new();
        collect_annotation_strings(&mut c, 0, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
