use std::collections::HashMap;

use serde::{Serialize, Serializer};
use tracing::debug;

use crate::config::EnsembleConfig;
use crate::spelling::SpellCorrector;

use super::corpus::ValidatedWords;
use super::scheduler::OutTexts;

/// Cutoffs applied while ranking. The defaults are empirically tuned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingThresholds {
    /// Validated entries scoring at or below `leader * noise_ratio` are dropped
    pub noise_ratio: f64,
    /// Enrichment floor used when nothing validated
    pub default_floor: f64,
    /// How many of the most frequent raw texts are considered for enrichment
    pub candidate_cap: usize,
}

impl Default for RankingThresholds {
    fn default() -> Self {
        Self {
            noise_ratio: 0.04,
            default_floor: 0.01,
            candidate_cap: 3,
        }
    }
}

impl RankingThresholds {
    pub fn from_config(config: &EnsembleConfig) -> Self {
        Self {
            noise_ratio: config.noise_ratio,
            default_floor: config.default_floor,
            candidate_cap: config.candidate_cap,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Score {
    /// Share of attempts that produced this text
    Frequency(f64),
    /// Spell-corrected addition; carries no frequency and ranks last
    Corrected,
}

impl Score {
    pub const CORRECTED_VALUE: f64 = -1.0;

    pub fn value(self) -> f64 {
        match self {
            Score::Frequency(f) => f,
            Score::Corrected => Self::CORRECTED_VALUE,
        }
    }
}

impl Serialize for Score {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.value())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub text: String,
    pub score: Score,
}

impl Suggestion {
    pub fn scored(text: impl Into<String>, frequency: f64) -> Self {
        Self {
            text: text.into(),
            score: Score::Frequency(frequency),
        }
    }

    pub fn corrected(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            score: Score::Corrected,
        }
    }
}

/// Distinct texts with their relative frequency, most frequent first.
///
/// Frequencies are rounded to two decimals. Equal
/// frequencies keep the order in which the texts were first seen.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrequencyTable {
    entries: Vec<(String, f64)>,
}

impl FrequencyTable {
    pub fn entries(&self) -> &[(String, f64)] {
        &self.entries
    }

    pub fn get(&self, text: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, f)| *f)
    }

    pub fn top(&self, n: usize) -> &[(String, f64)] {
        &self.entries[..n.min(self.entries.len())]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn frequencies<'a, I>(values: I) -> FrequencyTable
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for value in values {
        match index.get(value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    let total: usize = counts.iter().map(|(_, c)| c).sum();
    let mut entries: Vec<(String, f64)> = counts
        .into_iter()
        .map(|(text, count)| (text.to_string(), round2(count as f64 / total as f64)))
        .collect();
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));

    FrequencyTable { entries }
}

/// Round to two decimals on the exact binary value of `x`, so 1/40
/// (stored slightly above 0.025) goes up and 3/40 (slightly below 0.075)
/// goes down.
fn round2(x: f64) -> f64 {
    format!("{x:.2}").parse().unwrap_or(x)
}

fn contains_text(suggestions: &[Suggestion], text: &str) -> bool {
    suggestions.iter().any(|s| s.text == text)
}

/// Collapse the ensemble's outputs into a ranked suggestion list.
///
/// 1. Validated texts are ranked by how many attempts agreed on them.
/// 2. When anything validated, entries at or below `noise_ratio` × the
///    leader's score are dropped (even if that leaves nothing), and the
///    enrichment floor becomes the lower of the mean validated score and
///    the leader's share among all single-line outputs. Otherwise the
///    floor is `default_floor`.
/// 3. The `candidate_cap` most frequent single-line raw outputs that are
///    above the floor and not yet listed are appended, each followed by its
///    spell-corrected form (score −1) unless that text is already listed.
/// 4. The list is stably sorted by descending score.
pub fn generate_suggestions(
    out_texts: &OutTexts,
    validated: &ValidatedWords,
    thresholds: &RankingThresholds,
    corrector: &dyn SpellCorrector,
) -> Vec<Suggestion> {
    let validated_freqs = frequencies(validated.values().map(String::as_str));
    let raw_freqs = frequencies(
        out_texts
            .values()
            .map(String::as_str)
            .filter(|text| !text.is_empty() && !text.contains('\n')),
    );

    let mut suggestions: Vec<Suggestion> = validated_freqs
        .entries()
        .iter()
        .map(|(text, freq)| Suggestion::scored(text.as_str(), *freq))
        .collect();

    let enrichment_floor = match validated_freqs.entries().first() {
        Some((leader, leader_score)) => {
            let leader_general_score = raw_freqs.get(leader).unwrap_or(0.0);
            let mean_score = validated_freqs.entries().iter().map(|(_, f)| f).sum::<f64>()
                / validated_freqs.len() as f64;
            let noise_ceiling = leader_score * thresholds.noise_ratio;

            suggestions.retain(|s| s.score.value() > noise_ceiling);
            debug!(
                %leader,
                leader_general_score,
                mean_score,
                noise_ceiling,
                kept = suggestions.len(),
                "Filtered validated suggestions"
            );
            mean_score.min(leader_general_score)
        }
        None => thresholds.default_floor,
    };

    for (text, freq) in raw_freqs.top(thresholds.candidate_cap) {
        if *freq <= enrichment_floor || contains_text(&suggestions, text) {
            continue;
        }
        suggestions.push(Suggestion::scored(text.as_str(), *freq));

        let corrected = corrector.correct(text);
        if !contains_text(&suggestions, &corrected) {
            suggestions.push(Suggestion::corrected(corrected));
        }
    }

    suggestions.sort_by(|a, b| b.score.value().total_cmp(&a.score.value()));
    suggestions
}

/// Resolve a user's choice against a suggestion list.
///
/// No pick means the top suggestion; a number within range selects that
/// entry; anything else is taken as the word the user typed.
pub fn choose_suggestion(suggestions: &[Suggestion], pick: Option<&str>) -> Option<String> {
    let pick = pick.map(str::trim).filter(|p| !p.is_empty());
    match pick {
        None => suggestions.first().map(|s| s.text.clone()),
        Some(p) => match p.parse::<usize>() {
            Ok(i) if i < suggestions.len() => Some(suggestions[i].text.clone()),
            _ => Some(p.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::key::AttemptKey;
    use crate::ocr::RecognitionMode;
    use crate::spelling::IdentityCorrector;
    use pretty_assertions::assert_eq;

    fn texts(entries: &[(u32, &str)]) -> OutTexts {
        entries
            .iter()
            .map(|&(variant, text)| {
                let key = if variant == 0 {
                    AttemptKey::plain(RecognitionMode::AutoWithOsd)
                } else {
                    AttemptKey::composite(RecognitionMode::AutoWithOsd, variant)
                };
                (key, text.to_string())
            })
            .collect()
    }

    /// Appends "!" so corrected forms are always distinct.
    fn exclaim(text: &str) -> String {
        format!("{text}!")
    }

    #[test]
    fn test_frequencies_sorted_and_rounded() {
        let table = frequencies(["b", "a", "a", "c", "a", "b"]);
        assert_eq!(
            table.entries(),
            &[
                ("a".to_string(), 0.5),
                ("b".to_string(), 0.33),
                ("c".to_string(), 0.17)
            ]
        );
    }

    #[test]
    fn test_frequency_ties_keep_first_seen_order() {
        let table = frequencies(["y", "x", "x", "y", "z"]);
        let order: Vec<&str> = table.entries().iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(order, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_round2_uses_stored_value() {
        assert_eq!(round2(1.0 / 40.0), 0.03);
        assert_eq!(round2(3.0 / 40.0), 0.07);
        assert_eq!(round2(7.0 / 40.0), 0.17);
        assert_eq!(round2(9.0 / 40.0), 0.23);
        assert_eq!(round2(1.0 / 3.0), 0.33);
        assert_eq!(round2(1.0), 1.0);
    }

    #[test]
    fn test_frequencies_of_forty_attempts() {
        let mut values = vec!["a"; 36];
        values.extend(["b"; 3]);
        values.push("c");

        let table = frequencies(values);
        assert_eq!(table.get("a"), Some(0.9));
        assert_eq!(table.get("b"), Some(0.07));
        assert_eq!(table.get("c"), Some(0.03));
    }

    #[test]
    fn test_empty_inputs_give_empty_list() {
        let suggestions = generate_suggestions(
            &OutTexts::new(),
            &ValidatedWords::new(),
            &RankingThresholds::default(),
            &IdentityCorrector,
        );
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_unanimous_validated_word() {
        let out = texts(&[(0, "cat"), (50, "cat"), (55, "car"), (60, "cat")]);
        let validated = texts(&[(0, "cat"), (50, "cat"), (60, "cat")]);

        let suggestions = generate_suggestions(
            &out,
            &validated,
            &RankingThresholds::default(),
            &exclaim,
        );
        // "car" at 0.25 is below the floor of min(1.0, 0.75)
        assert_eq!(suggestions, vec![Suggestion::scored("cat", 1.0)]);
    }

    #[test]
    fn test_no_validation_falls_back_to_raw_agreement() {
        let out = texts(&[(0, "abc"), (50, "abc"), (55, "abc"), (60, "abd")]);

        let suggestions = generate_suggestions(
            &out,
            &ValidatedWords::new(),
            &RankingThresholds::default(),
            &exclaim,
        );
        assert_eq!(
            suggestions,
            vec![
                Suggestion::scored("abc", 0.75),
                Suggestion::scored("abd", 0.25),
                Suggestion::corrected("abc!"),
                Suggestion::corrected("abd!"),
            ]
        );
    }

    #[test]
    fn test_correction_equal_to_candidate_is_not_duplicated() {
        let out = texts(&[(0, "abc"), (50, "abc")]);

        let suggestions = generate_suggestions(
            &out,
            &ValidatedWords::new(),
            &RankingThresholds::default(),
            &IdentityCorrector,
        );
        assert_eq!(suggestions, vec![Suggestion::scored("abc", 1.0)]);
    }

    #[test]
    fn test_noise_ceiling_drops_marginal_matches() {
        let mut entries: Vec<(u32, &str)> = (1..=30).map(|v| (v, "aa")).collect();
        entries.push((31, "bb"));
        let validated = texts(&entries);

        let suggestions = generate_suggestions(
            &validated.clone(),
            &validated,
            &RankingThresholds::default(),
            &IdentityCorrector,
        );
        // bb scores 0.03, under 0.97 * 0.04
        assert_eq!(suggestions, vec![Suggestion::scored("aa", 0.97)]);
    }

    #[test]
    fn test_filtering_may_leave_nothing() {
        let words: Vec<String> = (0..201).map(|i| format!("w{i:03}")).collect();
        let entries: Vec<(u32, &str)> = words
            .iter()
            .enumerate()
            .map(|(i, w)| (i as u32 + 1, w.as_str()))
            .collect();
        let validated = texts(&entries);

        let suggestions = generate_suggestions(
            &validated.clone(),
            &validated,
            &RankingThresholds::default(),
            &exclaim,
        );
        assert!(suggestions.is_empty());
    }

    #[test]
    fn test_multiline_outputs_are_ignored_for_enrichment() {
        let out = texts(&[(0, "ab\ncd"), (50, "ab\ncd"), (55, "xy")]);

        let suggestions = generate_suggestions(
            &out,
            &ValidatedWords::new(),
            &RankingThresholds::default(),
            &IdentityCorrector,
        );
        assert_eq!(suggestions, vec![Suggestion::scored("xy", 1.0)]);
    }

    #[test]
    fn test_candidate_cap_limits_enrichment() {
        let out = texts(&[(0, "aa"), (50, "bb"), (55, "cc"), (60, "dd")]);
        let thresholds = RankingThresholds {
            candidate_cap: 2,
            ..RankingThresholds::default()
        };

        let suggestions =
            generate_suggestions(&out, &ValidatedWords::new(), &thresholds, &IdentityCorrector);
        let listed: Vec<&str> = suggestions.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(listed, vec!["aa", "bb"]);
    }

    #[test]
    fn test_scores_are_non_increasing_and_deterministic() {
        let out = texts(&[
            (0, "กา"),
            (50, "กา"),
            (55, "กาบ"),
            (60, "ขา"),
            (65, "กา"),
            (70, "กาบ"),
        ]);
        let validated = texts(&[(0, "กา"), (50, "กา"), (55, "กาบ"), (65, "กา")]);
        let thresholds = RankingThresholds::default();

        let first = generate_suggestions(&out, &validated, &thresholds, &exclaim);
        let second = generate_suggestions(&out, &validated, &thresholds, &exclaim);
        assert_eq!(first, second);
        assert!(first
            .windows(2)
            .all(|w| w[0].score.value() >= w[1].score.value()));
    }

    #[test]
    fn test_score_serializes_as_number() {
        let json = serde_json::to_value(vec![
            Suggestion::scored("cat", 0.5),
            Suggestion::corrected("cart"),
        ])
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"text": "cat", "score": 0.5},
                {"text": "cart", "score": -1.0}
            ])
        );
    }

    #[test]
    fn test_choose_suggestion() {
        let suggestions = vec![
            Suggestion::scored("cat", 0.8),
            Suggestion::scored("car", 0.2),
        ];
        assert_eq!(choose_suggestion(&suggestions, None).as_deref(), Some("cat"));
        assert_eq!(choose_suggestion(&suggestions, Some("")).as_deref(), Some("cat"));
        assert_eq!(choose_suggestion(&suggestions, Some("1")).as_deref(), Some("car"));
        assert_eq!(choose_suggestion(&suggestions, Some("7")).as_deref(), Some("7"));
        assert_eq!(choose_suggestion(&suggestions, Some("dog")).as_deref(), Some("dog"));
        assert_eq!(choose_suggestion(&[], None), None);
    }
}
