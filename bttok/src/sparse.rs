use std::fmt;
use std::io::{self, Write};

/// Present features of one window, in increasing window-offset order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseVector {
    entries: Vec<(u32, f32)>,
}

impl SparseVector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks feature `id` as present.
    pub fn push(&mut self, id: u32) {
        self.entries.push((id, 1.0));
    }

    pub fn entries(&self) -> &[(u32, f32)] {
        &self.entries
    }

    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|&(id, _)| id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Renders the vector as one line of the scorer's input format,
    /// `<label> <id>:<weight> ...`.
    pub fn to_row(&self, label: RowLabel) -> String {
        let mut row = label.to_string();
        for &(id, weight) in &self.entries {
            row.push_str(&format!(" {}:{:.1}", id, weight));
        }
        row
    }
}

impl FromIterator<u32> for SparseVector {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        SparseVector {
            entries: iter.into_iter().map(|id| (id, 1.0)).collect(),
        }
    }
}

/// The leading label field of a sparse row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLabel {
    /// Unknown label at inference time, rendered as `0.5`.
    Placeholder,
    /// Boundary (`1.00`) or non-boundary (`0.00`) training row.
    Binary(bool),
    /// Multiclass training row, rendered as the class id.
    Class(u32),
}

impl fmt::Display for RowLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowLabel::Placeholder => write!(f, "0.5"),
            RowLabel::Binary(boundary) => {
                write!(f, "{:.2}", if *boundary { 1.0 } else { 0.0 })
            }
            RowLabel::Class(id) => write!(f, "{}", id),
        }
    }
}

/// Writes one row per vector, all with the same label.
pub fn write_rows<W: Write>(
    writer: &mut W,
    label: RowLabel,
    vectors: &[SparseVector],
) -> io::Result<()> {
    for vector in vectors {
        writeln!(writer, "{}", vector.to_row(label))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(RowLabel::Placeholder.to_string(), "0.5");
        assert_eq!(RowLabel::Binary(true).to_string(), "1.00");
        assert_eq!(RowLabel::Binary(false).to_string(), "0.00");
        assert_eq!(RowLabel::Class(12).to_string(), "12");
    }

    #[test]
    fn test_to_row() {
        let vector: SparseVector = vec![4, 0, 17].into_iter().collect();
        assert_eq!(vector.to_row(RowLabel::Placeholder), "0.5 4:1.0 0:1.0 17:1.0");
        assert_eq!(SparseVector::new().to_row(RowLabel::Binary(true)), "1.00");
    }

    #[test]
    fn test_write_rows() -> io::Result<()> {
        let mut first = SparseVector::new();
        first.push(1);
        let vectors = vec![first, SparseVector::new()];

        let mut out = Vec::new();
        write_rows(&mut out, RowLabel::Class(3), &vectors)?;
        assert_eq!(String::from_utf8_lossy(&out), "3 1:1.0\n3\n");
        Ok(())
    }
}
