/// Console commands, matching and argument parsing
use crate::query::{SortField, View, MIN_SCORE_CHOICES};

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub usage: &'static str,
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "view",
    aliases: &["v", "tab"],
    usage: "view <all|accepted|rejected|starred|gcms|shopify>",
    description: "Switch list view",
  },
  Command {
    name: "search",
    aliases: &["s", "find", "/"],
    usage: "search [text]",
    description: "Search by name, email or skills (empty clears)",
  },
  Command {
    name: "min",
    aliases: &["m", "score", "filter"],
    usage: "min <50|60|70|80|90|off>",
    description: "Minimum score filter (same value again clears)",
  },
  Command {
    name: "sort",
    aliases: &["o", "order"],
    usage: "sort <score|date>",
    description: "Sort field (same field again flips direction)",
  },
  Command {
    name: "page",
    aliases: &["p", "goto"],
    usage: "page <n>",
    description: "Go to page",
  },
  Command {
    name: "next",
    aliases: &["n"],
    usage: "next",
    description: "Next page",
  },
  Command {
    name: "prev",
    aliases: &["b", "back", "previous"],
    usage: "prev",
    description: "Previous page",
  },
  Command {
    name: "star",
    aliases: &["save", "unstar"],
    usage: "star <id>",
    description: "Toggle the starred flag",
  },
  Command {
    name: "delete",
    aliases: &["d", "rm"],
    usage: "delete <id>",
    description: "Delete one CV",
  },
  Command {
    name: "bulk",
    aliases: &["bd", "bulk-delete"],
    usage: "bulk <id> <id>...",
    description: "Delete several CVs",
  },
  Command {
    name: "purge",
    aliases: &["delete-all", "clear"],
    usage: "purge yes",
    description: "Delete every CV in the current view",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    usage: "refresh",
    description: "Reload, bypassing the cache",
  },
  Command {
    name: "stats",
    aliases: &["analytics", "st"],
    usage: "stats",
    description: "Submission counters for this view",
  },
  Command {
    name: "rows",
    aliases: &["ls", "list"],
    usage: "rows",
    description: "Print the current page",
  },
  Command {
    name: "help",
    aliases: &["h", "?"],
    usage: "help",
    description: "Show commands",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    usage: "quit",
    description: "Exit cvsync",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// A parsed console line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  View(View),
  Search(String),
  /// `None` clears the filter
  MinScore(Option<u8>),
  Sort(SortField),
  Page(u32),
  Next,
  Prev,
  Star(String),
  Delete(String),
  Bulk(Vec<String>),
  Purge,
  Refresh,
  Stats,
  Rows,
  Help,
  Quit,
}

/// Parse one console line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Action>, String> {
  let line = line.trim();
  if line.is_empty() {
    return Ok(None);
  }

  let (word, rest) = match line.split_once(char::is_whitespace) {
    Some((word, rest)) => (word, rest.trim()),
    None => (line, ""),
  };
  let cmd = get_suggestions(word)
    .into_iter()
    .next()
    .ok_or_else(|| format!("unknown command '{}' (try 'help')", word))?;
  let usage = || format!("usage: {}", cmd.usage);

  let action = match cmd.name {
    "view" => {
      if rest.is_empty() {
        return Err(usage());
      }
      Action::View(rest.parse()?)
    }
    "search" => Action::Search(rest.to_string()),
    "min" => match rest {
      "" | "off" | "none" | "clear" => Action::MinScore(None),
      value => {
        let score: u8 = value.parse().map_err(|_| usage())?;
        if !MIN_SCORE_CHOICES.contains(&score) {
          return Err(usage());
        }
        Action::MinScore(Some(score))
      }
    },
    "sort" => {
      if rest.is_empty() {
        return Err(usage());
      }
      Action::Sort(rest.parse()?)
    }
    "page" => Action::Page(rest.parse().map_err(|_| usage())?),
    "next" => Action::Next,
    "prev" => Action::Prev,
    "star" => Action::Star(single_id(rest).ok_or_else(usage)?),
    "delete" => Action::Delete(single_id(rest).ok_or_else(usage)?),
    "bulk" => {
      let ids: Vec<String> = rest.split_whitespace().map(str::to_string).collect();
      if ids.is_empty() {
        return Err(usage());
      }
      Action::Bulk(ids)
    }
    "purge" => {
      if rest != "yes" {
        return Err(format!("this deletes every CV in the view; confirm with '{}'", cmd.usage));
      }
      Action::Purge
    }
    "refresh" => Action::Refresh,
    "stats" => Action::Stats,
    "rows" => Action::Rows,
    "help" => Action::Help,
    "quit" => Action::Quit,
    other => return Err(format!("unhandled command '{}'", other)),
  };
  Ok(Some(action))
}

fn single_id(rest: &str) -> Option<String> {
  let mut parts = rest.split_whitespace();
  let id = parts.next()?;
  if parts.next().is_some() {
    return None;
  }
  Some(id.to_string())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::record::Category;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("search");
    assert_eq!(suggestions[0].name, "search");
  }

  #[test]
  fn test_alias_match() {
    assert_eq!(get_suggestions("n")[0].name, "next");
    assert_eq!(get_suggestions("rm")[0].name, "delete");
  }

  #[test]
  fn test_prefix_match() {
    assert_eq!(get_suggestions("ref")[0].name, "refresh");
    assert_eq!(get_suggestions("pu")[0].name, "purge");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("ulk");
    assert_eq!(suggestions[0].name, "bulk");
  }

  #[test]
  fn test_parse_view_and_filters() {
    assert_eq!(parse("  ").unwrap(), None);
    assert_eq!(
      parse("view gcms").unwrap(),
      Some(Action::View(View::Category(Category::Gcms)))
    );
    assert_eq!(parse("v saved").unwrap(), Some(Action::View(View::Starred)));
    assert!(parse("view").is_err());
    assert!(parse("view archive").is_err());

    assert_eq!(
      parse("search  jane doe ").unwrap(),
      Some(Action::Search("jane doe".to_string()))
    );
    assert_eq!(parse("search").unwrap(), Some(Action::Search(String::new())));

    assert_eq!(parse("min 70").unwrap(), Some(Action::MinScore(Some(70))));
    assert_eq!(parse("min off").unwrap(), Some(Action::MinScore(None)));
    assert!(parse("min 65").is_err());

    assert_eq!(parse("sort score").unwrap(), Some(Action::Sort(SortField::Score)));
    assert_eq!(
      parse("sort date").unwrap(),
      Some(Action::Sort(SortField::CreatedAt))
    );
  }

  #[test]
  fn test_parse_mutations() {
    assert_eq!(parse("star x9").unwrap(), Some(Action::Star("x9".to_string())));
    assert!(parse("star").is_err());
    assert!(parse("delete a1 a2").is_err());
    assert_eq!(
      parse("bulk a1 a2").unwrap(),
      Some(Action::Bulk(vec!["a1".to_string(), "a2".to_string()]))
    );
    assert!(parse("purge").is_err());
    assert_eq!(parse("purge yes").unwrap(), Some(Action::Purge));
  }

  #[test]
  fn test_parse_navigation() {
    assert_eq!(parse("page 3").unwrap(), Some(Action::Page(3)));
    assert!(parse("page x").is_err());
    assert_eq!(parse("next").unwrap(), Some(Action::Next));
    assert_eq!(parse("back").unwrap(), Some(Action::Prev));
    assert_eq!(parse("q").unwrap(), Some(Action::Quit));
    assert!(parse("zzz").is_err());
  }
}
