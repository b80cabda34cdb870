//! Thin deck reader: comment stripping, continuation joining, section
//! splitting.
//!
//! MCNP-style layout: an optional title line, then the cell card
//! section, the surface card section and the data card section,
//! separated by blank lines. `c` lines and `$` trailers are comments;
//! a line ending in `&` or a line starting with five blanks continues
//! the previous card.

use deck_geom::resolve::DeckInput;
use deck_geom::input::DataLine;

fn is_comment(line: &str) -> bool {
  let t = line.trim_start();
  t.eq_ignore_ascii_case("c") || t.to_ascii_lowercase().starts_with("c ")
}

fn strip_trailing_comment(line: &str) -> &str {
  match line.find('$') {
    Some(pos) => &line[..pos],
    None => line,
  }
}

/// Join one section's physical lines into logical cards.
fn join_section(file: &str, lines: &[(u64, String)]) -> Vec<DataLine> {
  let mut cards: Vec<DataLine> = Vec::new();
  for (num, raw) in lines {
    let continuation_indent = raw.starts_with("     ") && !raw.trim().is_empty();
    let text = strip_trailing_comment(raw).trim_end().to_string();
    if text.trim().is_empty() {
      continue;
    }
    let prev_continues = cards
      .last()
      .map(|c| c.data.trim_end().ends_with('&'))
      .unwrap_or(false);
    if (continuation_indent || prev_continues) && !cards.is_empty() {
      let last = cards.last_mut().unwrap();
      let mut base = last.data.trim_end().to_string();
      if let Some(stripped) = base.strip_suffix('&') {
        base = stripped.trim_end().to_string();
      }
      last.data = format!("{} {}", base, text.trim());
    } else {
      cards.push(DataLine::new(file, *num, text.trim().to_string()));
    }
  }
  // An unterminated trailing ampersand is dropped silently.
  for card in &mut cards {
    if let Some(stripped) = card.data.trim_end().strip_suffix('&') {
      card.data = stripped.trim_end().to_string();
    }
  }
  cards
}

/// Split a whole deck into the three card sections.
pub fn read_deck(file: &str, content: &str) -> DeckInput {
  let mut sections: Vec<Vec<(u64, String)>> = vec![Vec::new()];
  let mut lines = content.lines().enumerate().peekable();

  // A title line is any first line that does not parse as a card; the
  // safest heuristic is to drop it only when it contains no digits at
  // all or is marked as a message line.
  if let Some((_, first)) = lines.peek() {
    let head = first.trim().to_ascii_lowercase();
    if head.starts_with("message:") || head.starts_with("title") {
      lines.next();
    }
  }

  for (idx, line) in lines {
    if line.trim().is_empty() {
      if !sections.last().map(|s| s.is_empty()).unwrap_or(true) {
        sections.push(Vec::new());
      }
      continue;
    }
    if is_comment(line) {
      continue;
    }
    sections
      .last_mut()
      .unwrap()
      .push((idx as u64 + 1, line.to_string()));
  }

  let mut input = DeckInput::default();
  let mut iter = sections.into_iter().filter(|s| !s.is_empty());
  if let Some(cells) = iter.next() {
    input.cell_cards = join_section(file, &cells);
  }
  if let Some(surfaces) = iter.next() {
    input.surface_cards = join_section(file, &surfaces);
  }
  for data in iter {
    input.data_cards.extend(join_section(file, &data));
  }
  input
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn splits_sections_and_joins_continuations() {
    let deck = "\
1 0 -B $ the box
2 0 B &
     -W

B rpp 0 10 0 10 0 10
c a comment line
W so 50

tr1 0 0 10
";
    let input = read_deck("test.i", deck);
    assert_eq!(input.cell_cards.len(), 2);
    assert_eq!(input.cell_cards[0].data, "1 0 -B");
    assert_eq!(input.cell_cards[1].data, "2 0 B -W");
    assert_eq!(input.surface_cards.len(), 2);
    assert_eq!(input.surface_cards[1].data, "W so 50");
    assert_eq!(input.data_cards.len(), 1);
    assert_eq!(input.data_cards[0].data, "tr1 0 0 10");
  }

  #[test]
  fn five_space_continuation() {
    let deck = "\
1 0 -B
     -W
2 0 B W

B rpp 0 1 0 1 0 1
W so 9
";
    let input = read_deck("t.i", deck);
    assert_eq!(input.cell_cards.len(), 2);
    assert_eq!(input.cell_cards[0].data, "1 0 -B -W");
  }
}
