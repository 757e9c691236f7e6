// Line unwrapping
//
// Long interlinear examples are wrapped by Toolbox into several blocks:
//
//   \tx word1 word2
//   \ge gls1  gls2
//   \tx word3
//   \ge gls3
//
// Joining each tier naively would shift the columns of later blocks. Every
// block chunk is therefore padded to the width of the widest line in its
// block before the chunks are concatenated, which keeps all tiers column
// consistent.

use tbfst_core::Tag;

use crate::record::Record;
use crate::scanner::Field;

/// Join wrapped blocks of the given markers into single logical lines.
///
/// A new block starts whenever one of `markers` repeats. The joined value
/// replaces the first occurrence of each marker; later occurrences are
/// dropped. Other fields are left where they are. Records without repeated
/// markers are returned unchanged.
pub fn unwrap_record(record: &Record, markers: &[Tag]) -> Record {
    // blocks[b][m] = value of markers[m] in block b
    let mut blocks: Vec<Vec<Option<&str>>> = Vec::new();
    for field in &record.fields {
        let Some(m) = markers.iter().position(|t| *t == field.tag) else {
            continue;
        };
        let needs_new = blocks.last().is_none_or(|block| block[m].is_some());
        if needs_new {
            blocks.push(vec![None; markers.len()]);
        }
        if let Some(block) = blocks.last_mut() {
            block[m] = Some(field.value.as_str());
        }
    }

    if blocks.len() <= 1 {
        return record.clone();
    }

    let mut joined: Vec<String> = vec![String::new(); markers.len()];
    let last = blocks.len() - 1;
    for (b, block) in blocks.iter().enumerate() {
        let width = block
            .iter()
            .flatten()
            .map(|v| v.chars().count())
            .max()
            .unwrap_or(0);
        for (m, value) in block.iter().enumerate() {
            let value = value.unwrap_or("");
            if b == last {
                joined[m].push_str(value);
            } else {
                joined[m].push_str(&format!("{value:<width$} "));
            }
        }
    }

    let mut emitted = vec![false; markers.len()];
    let mut fields = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        match markers.iter().position(|t| *t == field.tag) {
            Some(m) if emitted[m] => {}
            Some(m) => {
                emitted[m] = true;
                fields.push(Field {
                    tag: field.tag.clone(),
                    value: joined[m].trim_end().to_string(),
                    line: field.line,
                });
            }
            None => fields.push(field.clone()),
        }
    }

    Record {
        context: record.context.clone(),
        fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Records;
    use crate::scanner::MarkerReader;

    fn tag(s: &str) -> Tag {
        Tag::new(s).unwrap()
    }

    fn record(input: &str) -> Record {
        let keys = [tag("ref")];
        Records::new(MarkerReader::new(input.as_bytes(), "<test>"), &keys)
            .next()
            .unwrap()
            .unwrap()
    }

    fn value(rec: &Record, t: &str) -> String {
        rec.tier(&tag(t)).unwrap().text
    }

    #[test]
    fn wrapped_blocks_are_joined_column_consistently() {
        let rec = record(
            "\\tx baixou    a\n\\ge lower.PST the\n\\tx bola\n\\ge ball\n\\ft He lowered the ball.\n",
        );
        let unwrapped = unwrap_record(&rec, &[tag("tx"), tag("ge")]);

        assert_eq!(unwrapped.fields.len(), 3);
        // The first block is 13 chars wide ("lower.PST the"), plus one separator
        assert_eq!(value(&unwrapped, "tx"), "baixou    a   bola");
        assert_eq!(value(&unwrapped, "ge"), "lower.PST the ball");
        assert_eq!(value(&unwrapped, "ft"), "He lowered the ball.");

        let tx = value(&unwrapped, "tx");
        let ge = value(&unwrapped, "ge");
        assert_eq!(tx.find("bola"), ge.find("ball"));
    }

    #[test]
    fn missing_tier_in_block_is_padded() {
        let rec = record("\\tx a b\n\\tx c\n\\ge z\n");
        let unwrapped = unwrap_record(&rec, &[tag("tx"), tag("ge")]);
        assert_eq!(value(&unwrapped, "tx"), "a b c");
        assert_eq!(value(&unwrapped, "ge"), "    z");
    }

    #[test]
    fn single_block_is_unchanged() {
        let rec = record("\\tx a  b\n\\ge x  y\n");
        assert_eq!(unwrap_record(&rec, &[tag("tx"), tag("ge")]), rec);
    }

    #[test]
    fn unrelated_markers_do_not_split_blocks() {
        let rec = record("\\tx a\n\\nt note\n\\nt note2\n\\ge x\n");
        let unwrapped = unwrap_record(&rec, &[tag("tx"), tag("ge")]);
        assert_eq!(unwrapped, rec);
    }
}
