//! Minimal RFC 2822 / Debian-control style paragraph reader.
//!
//! Only what manifests need is supported: `Key: value` lines, continuation
//! lines starting with whitespace, blank-line paragraph separators and `#`
//! comment lines (removed before anything else happens).

use super::types::ParseError;

/// A single `Key: value` field. Continuation lines are joined with `\n`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
  pub key: String,
  pub value: String,
  pub line: usize,
}

/// One non-empty paragraph, fields in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Paragraph {
  pub fields: Vec<Field>,
}

/// Returns true for lines whose first non-whitespace character is `#`.
pub fn is_comment(line: &str) -> bool {
  line.trim_start().starts_with('#')
}

/// Split `text` into paragraphs.
///
/// Empty paragraphs (leading, trailing or repeated blank lines) never appear in
/// the result.
pub fn paragraphs(text: &str) -> Result<Vec<Paragraph>, ParseError> {
  let mut out = Vec::new();
  let mut current = Paragraph::default();

  for (idx, raw) in text.lines().enumerate() {
    let line_no = idx + 1;
    if is_comment(raw) {
      continue;
    }
    if raw.trim().is_empty() {
      if !current.fields.is_empty() {
        out.push(std::mem::take(&mut current));
      }
      continue;
    }

    if raw.starts_with(char::is_whitespace) {
      let Some(last) = current.fields.last_mut() else {
        return Err(ParseError::Syntax {
          line: line_no,
          message: "continuation line without a preceding field".to_string(),
        });
      };
      last.value.push('\n');
      last.value.push_str(raw.trim());
      continue;
    }

    let Some((key, value)) = raw.split_once(':') else {
      return Err(ParseError::Syntax {
        line: line_no,
        message: format!("expected 'Key: value', got {:?}", raw),
      });
    };
    let key = key.trim();
    if key.is_empty() {
      return Err(ParseError::Syntax {
        line: line_no,
        message: "empty field name".to_string(),
      });
    }
    current.fields.push(Field {
      key: key.to_string(),
      value: value.trim().to_string(),
      line: line_no,
    });
  }

  if !current.fields.is_empty() {
    out.push(current);
  }
  Ok(out)
}

/// Split a list value on `,`, trimming whitespace (including newlines from
/// continuation lines) and dropping empty items.
pub fn split_list(value: &str) -> Vec<String> {
  value
    .split(',')
    .map(|item| item.trim_matches(|c: char| c.is_whitespace()))
    .filter(|item| !item.is_empty())
    .map(str::to_string)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn splits_paragraphs_and_ignores_blank_runs() {
    let text = "\n\nMaintainers: a\n\n\n\nTags: 1\nGitRepo: r\n\n";
    let paras = paragraphs(text).unwrap();

    assert_eq!(paras.len(), 2);
    assert_eq!(paras[0].fields[0].key, "Maintainers");
    assert_eq!(paras[1].fields.len(), 2);
    assert_eq!(paras[1].fields[0].line, 7);
    assert_eq!(paras[1].fields[1].line, 8);
  }

  #[test]
  fn whitespace_only_line_separates() {
    let paras = paragraphs("A: 1\n   \t\nB: 2\n").unwrap();
    assert_eq!(paras.len(), 2);
  }

  #[test]
  fn comments_do_not_break_paragraphs() {
    let paras = paragraphs("A: 1\n# note\n  # indented\nB: 2\n").unwrap();
    assert_eq!(paras.len(), 1);
    assert_eq!(paras[0].fields.len(), 2);
  }

  #[test]
  fn continuation_lines_join() {
    let paras = paragraphs("Maintainers: a (@a),\n  b (@b)\n").unwrap();
    assert_eq!(paras[0].fields[0].value, "a (@a),\nb (@b)");
    assert_eq!(split_list(&paras[0].fields[0].value), vec!["a (@a)", "b (@b)"]);
  }

  #[test]
  fn line_without_colon_is_an_error() {
    let err = paragraphs("A: 1\nnonsense\n").unwrap_err();
    assert!(matches!(err, ParseError::Syntax { line: 2, .. }));
  }

  #[test]
  fn split_list_drops_empty_items() {
    assert_eq!(split_list(" a , ,b,"), vec!["a", "b"]);
    assert!(split_list("").is_empty());
  }
}
