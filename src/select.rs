// src/select.rs

use std::{collections::BTreeSet, fmt};

use crate::{
    fetch::{Branch, FetchError, Fetcher, Transport},
    level::ProgramLevel,
};

/// User-supplied narrowing of a run. Empty means "everything".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub level: Option<ProgramLevel>,
    pub courses: Option<BTreeSet<String>>,
}

impl Selection {
    /// Course codes are trimmed and upper-cased; blanks are ignored.
    pub fn new<I, S>(level: Option<ProgramLevel>, courses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let courses: BTreeSet<String> = courses
            .into_iter()
            .map(|c| c.as_ref().trim().to_uppercase())
            .filter(|c| !c.is_empty())
            .collect();
        Self {
            level,
            courses: (!courses.is_empty()).then_some(courses),
        }
    }

    pub fn is_unfiltered(&self) -> bool {
        self.level.is_none() && self.courses.is_none()
    }

    pub fn resolve_levels(&self) -> Vec<ProgramLevel> {
        match self.level {
            Some(level) => vec![level],
            None => ProgramLevel::ALL.to_vec(),
        }
    }

    /// Keep the branches the course filter names, in their original order.
    pub fn filter_branches(&self, branches: Vec<Branch>) -> Vec<Branch> {
        match &self.courses {
            None => branches,
            Some(wanted) => branches
                .into_iter()
                .filter(|b| wanted.contains(&b.code.to_uppercase()))
                .collect(),
        }
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unfiltered() {
            return f.write_str("none");
        }
        let mut parts = Vec::new();
        if let Some(level) = self.level {
            parts.push(format!("level={}", level));
        }
        if let Some(courses) = &self.courses {
            let list: Vec<&str> = courses.iter().map(String::as_str).collect();
            parts.push(format!("courses={}", list.join(",")));
        }
        f.write_str(&parts.join(" "))
    }
}

/// Branch list for `level` after the course filter. An empty result with a
/// filter in place means the level has nothing to do.
pub async fn resolve_branches<T: Transport>(
    fetcher: &Fetcher<T>,
    level: ProgramLevel,
    selection: &Selection,
) -> Result<Vec<Branch>, FetchError> {
    let all = fetcher.fetch_branches(level).await?;
    Ok(selection.filter_branches(all))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn branch(code: &str, id: u64) -> Branch {
        Branch {
            code: code.to_string(),
            id,
        }
    }

    #[test]
    fn no_filters_means_every_level() {
        let s = Selection::new(None, Vec::<String>::new());
        assert!(s.is_unfiltered());
        assert_eq!(s.resolve_levels(), ProgramLevel::ALL.to_vec());
        assert_eq!(s.to_string(), "none");
    }

    #[test]
    fn level_filter_narrows_to_one() {
        let s = Selection::new(Some(ProgramLevel::Graduate), Vec::<String>::new());
        assert_eq!(s.resolve_levels(), vec![ProgramLevel::Graduate]);
    }

    #[test]
    fn course_filter_keeps_order_and_ignores_case() {
        let s = Selection::new(None, [" mat", "BBF", ""]);
        let kept = s.filter_branches(vec![branch("BBF", 1), branch("EHB", 2), branch("MAT", 3)]);
        assert_eq!(kept, vec![branch("BBF", 1), branch("MAT", 3)]);
        assert_eq!(s.to_string(), "courses=BBF,MAT");
    }

    #[test]
    fn unmatched_course_filter_yields_nothing() {
        let s = Selection::new(Some(ProgramLevel::Associate), ["ZZZ"]);
        assert!(s.filter_branches(vec![branch("AKM", 1)]).is_empty());
        assert_eq!(s.to_string(), "level=OL courses=ZZZ");
    }
}
