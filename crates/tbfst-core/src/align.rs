// Field aligner: column inference between parallel tiers
//
// Toolbox pads interlinear tiers with spaces so that every gloss starts in
// the column of the token it glosses. Token `i` of the tier aligned against
// therefore owns the columns from its own start up to the start of token
// `i + 1`. A dependent token belongs to the region it starts in, must start
// inside token `i` itself and must end before the next region begins. A token
// that overlaps no parent token, or runs into the next one, is reported,
// never repaired.

use crate::span::{AlignedToken, ColumnSpan, SubToken, tokenize};
use crate::{AlignError, AlignmentMap, Tag, TierLine};

/// Align every dependent line of a record.
///
/// Each line is aligned against the tier the map names as its parent, which
/// must be `root_line` or another of `dependent_lines`. Lines whose tier has
/// no parent are free-text units (see [`unaligned`]). The result keeps the
/// order of `dependent_lines`.
pub fn align(
    root_line: &TierLine,
    dependent_lines: &[TierLine],
    alignment_map: &AlignmentMap,
) -> Result<Vec<(Tag, Vec<AlignedToken>)>, AlignError> {
    let find = |tag: &Tag| {
        std::iter::once(root_line)
            .chain(dependent_lines.iter())
            .find(|line| line.tag == *tag)
    };

    let mut aligned = Vec::with_capacity(dependent_lines.len());
    for line in dependent_lines {
        let tokens = match alignment_map.parent(&line.tag) {
            Some(parent_tag) => {
                let parent = find(parent_tag).ok_or_else(|| AlignError::MissingParent {
                    tag: line.tag.clone(),
                    parent: parent_tag.clone(),
                })?;
                align_tier(parent, line)?
            }
            None => unaligned(line),
        };
        aligned.push((line.tag.clone(), tokens));
    }
    Ok(aligned)
}

/// Align the tokens of `dependent` against the column regions of `parent`.
///
/// `parent` does not have to be the direct parent: any tier further up the
/// alignment chain shares the same columns, so a gloss tier can be projected
/// straight onto the text tier. Every parent token yields one
/// [`AlignedToken`], possibly with no sub-tokens.
pub fn align_tier(parent: &TierLine, dependent: &TierLine) -> Result<Vec<AlignedToken>, AlignError> {
    let parent_tokens = tokenize(&parent.text);
    let mut aligned: Vec<AlignedToken> = parent_tokens
        .iter()
        .map(|t| AlignedToken {
            token: Some(t.text.clone()),
            span: Some(t.span),
            sub_tokens: Vec::new(),
        })
        .collect();

    for sub in tokenize(&dependent.text) {
        let region = region_of(&parent_tokens, sub.span).ok_or_else(|| AlignError::Ambiguous {
            tag: dependent.tag.clone(),
            parent: parent.tag.clone(),
            token: sub.text.clone(),
            span: sub.span,
        })?;
        aligned[region].sub_tokens.push(sub);
    }

    if rejoin(&dependent.text, &aligned).as_deref() != Some(dependent.text.as_str()) {
        return Err(AlignError::Lossy {
            tag: dependent.tag.clone(),
        });
    }

    Ok(aligned)
}

/// A line without an alignment target: one unit holding the whole line.
pub fn unaligned(line: &TierLine) -> Vec<AlignedToken> {
    let len = line.text.chars().count();
    vec![AlignedToken {
        token: None,
        span: None,
        sub_tokens: vec![SubToken {
            text: line.text.clone(),
            span: ColumnSpan::new(0, len),
        }],
    }]
}

/// Index of the parent region `span` lies in, or `None` if it starts before
/// the first region, starts in the gap after a parent token or runs into the
/// next region.
fn region_of(parent_tokens: &[SubToken], span: ColumnSpan) -> Option<usize> {
    // Number of parent tokens starting at or before `span.start`.
    let idx = parent_tokens.partition_point(|t| t.span.start <= span.start);
    let region = idx.checked_sub(1)?;
    if span.start >= parent_tokens[region].span.end {
        return None;
    }
    match parent_tokens.get(region + 1) {
        Some(next) if span.end > next.span.start => None,
        _ => Some(region),
    }
}

/// Rebuild a dependent line from its aligned sub-tokens, taking the gaps
/// between them from `line`.
///
/// Returns `None` if the sub-tokens are out of order, overlap, disagree with
/// the text at their span, or leave non-whitespace characters uncovered.
pub fn rejoin(line: &str, tokens: &[AlignedToken]) -> Option<String> {
    let chars: Vec<char> = line.chars().collect();
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;

    for sub in tokens.iter().flat_map(|t| t.sub_tokens.iter()) {
        let ColumnSpan { start, end } = sub.span;
        if start < cursor || end > chars.len() {
            return None;
        }
        let gap = &chars[cursor..start];
        if !gap.iter().all(|c| c.is_whitespace()) {
            return None;
        }
        if !chars[start..end].iter().copied().eq(sub.text.chars()) {
            return None;
        }
        out.extend(gap);
        out.push_str(&sub.text);
        cursor = end;
    }

    let tail = &chars[cursor..];
    if !tail.iter().all(|c| c.is_whitespace()) {
        return None;
    }
    out.extend(tail);
    Some(out)
}
