//! Byte inspector hook.

use crate::display::{ByteSpan, DisplayNode};

/// Receives the exact bytes of activated byte leaves.
///
/// Implemented for any `FnMut(&ByteSpan)`.
pub trait ByteInspector {
    fn inspect(&mut self, span: &ByteSpan);
}

impl<F: FnMut(&ByteSpan)> ByteInspector for F {
    fn inspect(&mut self, span: &ByteSpan) {
        self(span)
    }
}

/// Handle activation of `node` in a tree viewer.
///
/// Byte leaves are forwarded to `inspector`; everything else is ignored.
/// Returns whether the inspector was invoked.
pub fn activate(node: &DisplayNode, inspector: &mut dyn ByteInspector) -> bool {
    match node.span() {
        Some(span) => {
            inspector.inspect(span);
            true
        }
        None => false,
    }
}

/// Every byte span below `node`, in tree order.
pub fn byte_spans(node: &DisplayNode) -> Vec<&ByteSpan> {
    let mut spans = Vec::new();
    collect(node, &mut spans);
    spans
}

fn collect<'a>(node: &'a DisplayNode, spans: &mut Vec<&'a ByteSpan>) {
    if let Some(span) = node.span() {
        spans.push(span);
    }
    for child in node.children() {
        collect(child, spans);
    }
}

/// Classic 16-column hex dump, offsets relative to `base`.
pub fn hex_dump(bytes: &[u8], base: usize) -> String {
    let mut out = String::new();
    for (row, line) in bytes.chunks(16).enumerate() {
        out.push_str(&format!("{:08X} ", base + row * 16));
        for i in 0..16 {
            match line.get(i) {
                Some(b) => out.push_str(&format!(" {b:02X}")),
                None => out.push_str("   "),
            }
        }
        out.push_str("  ");
        out.extend(line.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}
