//! Column-aligned mismatch reports for layer chains

use crate::layer::{Layer, Layers};

enum Line {
    Row {
        layer: &'static str,
        field: &'static str,
        left: String,
        right: String,
    },
    Note(String),
}

fn slot_name(slot: &Option<Layer>) -> &'static str {
    slot.as_ref().map_or("nil", Layer::name)
}

/// Rows for `fields`, with the layer name on the first one only
fn push_rows<I>(lines: &mut Vec<Line>, layer: &'static str, fields: I)
where
    I: IntoIterator<Item = (&'static str, String, String)>,
{
    for (i, (field, left, right)) in fields.into_iter().enumerate() {
        lines.push(Line::Row {
            layer: if i == 0 { layer } else { "" },
            field,
            left,
            right,
        });
    }
}

fn compare(lines: &mut Vec<Line>, x: &Layer, y: &Layer) {
    if std::mem::discriminant(x) != std::mem::discriminant(y) {
        lines.push(Line::Note(format!("({} doesn't match {})", x.name(), y.name())));

        let left = x.set_fields();
        if left.is_empty() {
            lines.push(Line::Note(format!("({})", x.name())));
        }
        push_rows(
            lines,
            x.name(),
            left.into_iter().map(|(f, v)| (f, v, String::new())),
        );

        let right = y.set_fields();
        if right.is_empty() {
            lines.push(Line::Note(format!("({})", y.name())));
        }
        push_rows(
            lines,
            y.name(),
            right.into_iter().map(|(f, v)| (f, String::new(), v)),
        );
        return;
    }

    let rows = x.mismatched_fields(y);
    if rows.is_empty() {
        lines.push(Line::Note(format!("({} matches {})", x.name(), y.name())));
    }
    push_rows(lines, x.name(), rows);
}

/// Explain why `x` does not match `y`
///
/// Returns an empty string exactly when `x.matches(y)`. Otherwise every
/// position gets either a note or one row per differing field. Rows are
/// right-aligned in four columns (layer, field, `x` value, `y` value); a
/// blank value means the side has no such field set.
pub fn diff(x: &Layers, y: &Layers) -> String {
    if x.matches(y) {
        return String::new();
    }

    let (xs, ys) = (x.slots(), y.slots());
    let mut lines = Vec::new();
    for i in 0..xs.len().max(ys.len()) {
        match (xs.get(i), ys.get(i)) {
            (None, Some(b)) => {
                lines.push(Line::Note(format!("(missing matches {})", slot_name(b))))
            }
            (Some(a), None) => lines.push(Line::Note(format!(
                "({} doesn't match missing)",
                slot_name(a)
            ))),
            (Some(None), Some(b)) => {
                lines.push(Line::Note(format!("(nil matches {})", slot_name(b))))
            }
            (Some(Some(a)), Some(None)) => {
                lines.push(Line::Note(format!("({} matches nil)", a.name())))
            }
            (Some(Some(a)), Some(Some(b))) => compare(&mut lines, a, b),
            (None, None) => {}
        }
    }

    let (mut lw, mut fw, mut xw, mut yw) = (0, 0, 0, 0);
    for line in &lines {
        if let Line::Row {
            layer,
            field,
            left,
            right,
        } = line
        {
            lw = lw.max(layer.len());
            fw = fw.max(field.len());
            xw = xw.max(left.len());
            yw = yw.max(right.len());
        }
    }

    let mut out = String::new();
    for line in lines {
        match line {
            Line::Row {
                layer,
                field,
                left,
                right,
            } => {
                let sep = if layer.is_empty() { " " } else { ":" };
                out.push_str(&format!(
                    "{:>lw$}{} {:>fw$}: {:>xw$} {:>yw$}\n",
                    layer, sep, field, left, right
                ));
            }
            Line::Note(note) => {
                out.push_str(&note);
                out.push('\n');
            }
        }
    }
    out
}
