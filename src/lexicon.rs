//! Multilingual keyword tables consulted by the heuristic analyzer.
//!
//! The tables are plain data. [`Lexicon::standard`] registers the built-in English and
//! Korean vocabularies; callers can extend a lexicon with [`Lexicon::add_action_form`],
//! [`Lexicon::add_composite_form`] and [`Lexicon::add_object_form`] instead of writing a
//! new analyzer per language.
//!
//! Matching is done by [`find_keyword`]: ASCII keywords must sit on word boundaries,
//! everything else matches as a substring so Korean stems still match when particles or
//! verb endings are attached.

use crate::requirement::Action;

/// Keyword sets for the built-in vocabulary.
const ACTION_FORMS: &[(Action, &[&str])] = &[
    (
        Action::Pick,
        &[
            "pick", "picks", "picked", "picking", "grasp", "grasps", "grasped", "grasping",
            "grab", "grabs", "grabbed", "grabbing", "collect", "collects", "collected", "lift",
            "lifts", "lifted", "lifting", "집어", "집다", "집고", "잡아", "잡고", "잡다",
            "픽업", "들어올",
        ],
    ),
    (
        Action::Place,
        &[
            "place", "places", "placed", "placing", "put", "puts", "putting", "drop", "drops",
            "dropped", "dropping", "set down", "놓아", "놓고", "놓다", "놓기", "놓으",
            "내려놓", "배치", "적재",
        ],
    ),
    (
        Action::Move,
        &[
            "move", "moves", "moved", "moving", "carry", "carries", "carried", "carrying",
            "deliver", "delivers", "delivered", "delivering", "bring", "brings", "brought",
            "이동", "움직", "가져가", "가져와",
        ],
    ),
    (
        Action::Wait,
        &[
            "wait", "waits", "waited", "waiting", "pause", "pauses", "paused", "hold", "holds",
            "대기", "기다", "멈춰",
        ],
    ),
];

/// Verbs that expand to pick, move, place.
const COMPOSITE_FORMS: &[&str] = &[
    "transfer", "transfers", "transferred", "transferring", "transport", "transports",
    "transported", "transporting", "relocate", "relocates", "relocated", "이송", "옮기", "옮겨",
    "옮길", "옮긴", "운반",
];

/// Canonical object name and its surface forms.
const OBJECT_FORMS: &[(&str, &[&str])] = &[
    ("object", &["object", "objects", "물체", "물건"]),
    ("box", &["box", "boxes", "박스", "상자"]),
    ("cup", &["cup", "cups", "컵"]),
    ("component", &["component", "components", "부품"]),
    ("part", &["part", "parts"]),
    ("tool", &["tool", "tools", "공구"]),
    ("payload", &["payload", "payloads"]),
    ("workpiece", &["workpiece", "workpieces", "가공물"]),
    ("tray", &["tray", "trays", "트레이"]),
];

/// Tokens that location markers can capture but that never name a place.
const STOP_WORDS: &[&str] = &[
    "the", "an", "it", "them", "this", "that", "there", "here", "and", "then", "go", "be",
    "me", "you", "위", "아래", "앞", "뒤", "옆", "새", "바", "그", "이", "저", "여기", "거기",
];

/// A table of surface forms grouped by what they mean.
#[derive(Clone, Debug, Default)]
pub struct Lexicon {
    actions: Vec<(Action, Vec<String>)>,
    composite: Vec<String>,
    objects: Vec<(String, Vec<String>)>,
    stop_words: Vec<String>,
}

impl Lexicon {
    /// An empty lexicon. Nothing matches until forms are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in English + Korean vocabulary.
    pub fn standard() -> Self {
        let mut lexicon = Self::new();
        for (action, forms) in ACTION_FORMS {
            for form in *forms {
                lexicon.add_action_form(*action, form);
            }
        }
        for form in COMPOSITE_FORMS {
            lexicon.add_composite_form(form);
        }
        for (canonical, forms) in OBJECT_FORMS {
            for form in *forms {
                lexicon.add_object_form(canonical, form);
            }
        }
        lexicon.stop_words = STOP_WORDS.iter().map(|w| w.to_string()).collect();
        lexicon
    }

    /// Registers `form` as a surface form of `action`. Forms are stored lowercase.
    pub fn add_action_form(&mut self, action: Action, form: &str) {
        let form = form.to_lowercase();
        match self.actions.iter_mut().find(|(a, _)| *a == action) {
            Some((_, forms)) => forms.push(form),
            None => self.actions.push((action, vec![form])),
        }
    }

    pub fn add_composite_form(&mut self, form: &str) {
        self.composite.push(form.to_lowercase());
    }

    /// Registers `form` as a surface form of the object called `canonical`.
    pub fn add_object_form(&mut self, canonical: &str, form: &str) {
        let form = form.to_lowercase();
        match self.objects.iter_mut().find(|(c, _)| c == canonical) {
            Some((_, forms)) => forms.push(form),
            None => self.objects.push((canonical.to_string(), vec![form])),
        }
    }

    /// Earliest match position of each action in `haystack`, sorted by position.
    ///
    /// `haystack` must already be lowercase.
    pub fn match_actions(&self, haystack: &str) -> Vec<(usize, Action)> {
        let mut hits: Vec<(usize, Action)> = self
            .actions
            .iter()
            .filter_map(|(action, forms)| earliest(haystack, forms).map(|pos| (pos, *action)))
            .collect();
        hits.sort();
        hits
    }

    pub fn matches_composite(&self, haystack: &str) -> bool {
        earliest(haystack, &self.composite).is_some()
    }

    /// Every object hit as `(start, end, canonical)`, sorted by start.
    pub fn match_objects(&self, haystack: &str) -> Vec<(usize, usize, &str)> {
        let mut hits = Vec::new();
        for (canonical, forms) in &self.objects {
            for form in forms {
                for start in keyword_positions(haystack, form) {
                    hits.push((start, start + form.len(), canonical.as_str()));
                }
            }
        }
        // Longer forms first at the same start so "boxes" wins over "box".
        hits.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        hits
    }

    /// True when `token` must not be taken as a location name.
    pub fn is_non_location(&self, token: &str) -> bool {
        let token = token.to_lowercase();
        self.stop_words.iter().any(|w| *w == token)
            || self.actions.iter().any(|(_, forms)| forms.contains(&token))
            || self.composite.contains(&token)
    }
}

fn earliest(haystack: &str, forms: &[String]) -> Option<usize> {
    forms.iter().filter_map(|f| find_keyword(haystack, f)).min()
}

/// Position of the first occurrence of `keyword` in `haystack`.
///
/// Pure-ASCII keywords only match when not glued to other ASCII letters or digits.
pub fn find_keyword(haystack: &str, keyword: &str) -> Option<usize> {
    keyword_positions(haystack, keyword).next()
}

fn keyword_positions<'a>(haystack: &'a str, keyword: &'a str) -> impl Iterator<Item = usize> + 'a {
    let ascii = keyword.is_ascii();
    haystack
        .match_indices(keyword)
        .map(|(pos, _)| pos)
        .filter(move |&pos| !ascii || on_word_boundary(haystack, pos, pos + keyword.len()))
}

fn on_word_boundary(haystack: &str, start: usize, end: usize) -> bool {
    let before = haystack[..start].chars().next_back();
    let after = haystack[end..].chars().next();
    !before.is_some_and(|c| c.is_ascii_alphanumeric())
        && !after.is_some_and(|c| c.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ascii_keywords_respect_word_boundaries() {
        assert_eq!(find_keyword("pick the box", "pick"), Some(0));
        assert_eq!(find_keyword("toothpick holder", "pick"), None);
        assert_eq!(find_keyword("box를 집어", "box"), Some(0));
        assert_eq!(find_keyword("please set down the cup", "set down"), Some(7));
    }

    #[test]
    fn korean_stems_match_inside_words() {
        assert!(find_keyword("박스를 옮겨줘", "옮겨").is_some());
        assert!(find_keyword("상자를 컨베이어로 이동시켜", "이동").is_some());
    }

    #[test]
    fn object_hits_prefer_longest_form() {
        let lexicon = Lexicon::standard();
        let hits = lexicon.match_objects("two boxes");
        assert_eq!(hits[0], (4, 9, "box"));
    }
}
