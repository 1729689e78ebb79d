//! Small utility helpers used across modules.

/// Placeholder shown inside an empty input.
pub fn placeholder_for(label: &str) -> String {
  format!("Enter {}", label)
}

/// Human label derived from a camelCase field key: "dateOfBirth" becomes "Date Of Birth".
/// Every uppercase letter starts a new word, so acronyms come out spaced ("courseGPA" -> "Course G P A").
pub fn label_from_name(name: &str) -> String {
  let mut out = String::with_capacity(name.len() + 4);
  for (i, c) in name.trim().chars().enumerate() {
    if i == 0 {
      out.extend(c.to_uppercase());
    } else {
      if c.is_uppercase() {
        out.push(' ');
      }
      out.push(c);
    }
  }
  out
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge payloads.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn placeholder_prefixes_label() {
    assert_eq!(placeholder_for("Full Name"), "Enter Full Name");
  }

  #[test]
  fn labels_split_camel_case() {
    assert_eq!(label_from_name("dateOfBirth"), "Date Of Birth");
    assert_eq!(label_from_name("honors"), "Honors");
    assert_eq!(label_from_name("courseGPA"), "Course G P A");
    assert_eq!(label_from_name(""), "");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    assert_eq!(trunc_for_log("abcdef", 3), "abc… (6 bytes total)");
    // 'é' is two bytes; cutting at 2 would split it.
    assert_eq!(trunc_for_log("aébc", 2), "a… (5 bytes total)");
  }
}
