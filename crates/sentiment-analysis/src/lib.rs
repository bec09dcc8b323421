use analysis_core::{AnalysisError, Headline, HeadlineSource, SourceKind, SourceScore, SourceScorer};
use async_trait::async_trait;
use std::collections::HashSet;

pub mod feed;
pub mod llm;
pub mod precomputed;
pub mod regional;
pub mod remote;

pub use feed::StaticHeadlines;
pub use llm::LlmNewsScorer;
pub use precomputed::PrecomputedScorer;
pub use regional::RegionalMarketScorer;
pub use remote::HttpSourceScorer;

const NEGATION_WORDS: &[&str] = &[
    "not", "no", "never", "don't", "doesn't", "didn't", "isn't", "aren't",
    "wasn't", "weren't", "won't", "wouldn't", "couldn't", "shouldn't", "hardly",
    "barely", "neither", "nor", "without",
];

const NEGATION_WINDOW: usize = 3;

const POSITIVE_WORDS: &[&str] = &[
    "bullish", "rally", "surge", "surges", "gain", "gains", "profit", "growth", "beat",
    "beats", "upgrade", "outperform", "strong", "positive", "rise", "rises", "increase",
    "breakthrough", "success", "exceed", "exceeds", "momentum", "buy", "optimistic",
    "record", "high", "advance", "dividend", "buyback", "upside", "recovery", "rebound",
    "expansion", "robust", "accelerating", "overweight", "raised", "upgraded",
    "tailwind", "adoption", "approval", "partnership", "moon", "pump",
];

const NEGATIVE_WORDS: &[&str] = &[
    "bearish", "decline", "declines", "loss", "losses", "fall", "falls", "plunge",
    "plunges", "crash", "miss", "misses", "downgrade", "underperform", "weak",
    "negative", "drop", "drops", "decrease", "concern", "risk", "fail", "disappoint",
    "slump", "sell", "warning", "pessimistic", "low", "retreat", "fear", "trouble",
    "dilution", "headwind", "lawsuit", "investigation", "probe", "default",
    "bankruptcy", "layoff", "layoffs", "downside", "overvalued", "bubble",
    "underweight", "lowered", "suspended", "hack", "dump", "scam",
];

/// Financial word lists with short-range negation.
#[derive(Debug, Clone)]
pub struct Lexicon {
    positive: HashSet<&'static str>,
    negative: HashSet<&'static str>,
    negation: HashSet<&'static str>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::financial()
    }
}

impl Lexicon {
    pub fn financial() -> Self {
        Self {
            positive: POSITIVE_WORDS.iter().copied().collect(),
            negative: NEGATIVE_WORDS.iter().copied().collect(),
            negation: NEGATION_WORDS.iter().copied().collect(),
        }
    }

    /// Net polarity of `text` in [-1, 1]; 0 when no lexicon word appears.
    ///
    /// A lexicon word preceded by a negation within three words flips sign.
    pub fn score_text(&self, text: &str) -> f64 {
        let text_lower = text.to_lowercase();
        let words: Vec<&str> = text_lower
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '.' | '!' | '?' | ':' | '"' | '(' | ')'))
            .filter(|w| !w.is_empty())
            .collect();

        let negation_positions: Vec<usize> = words
            .iter()
            .enumerate()
            .filter(|(_, w)| self.negation.contains(*w))
            .map(|(i, _)| i)
            .collect();

        let mut score: i32 = 0;
        let mut hits: i32 = 0;

        for (i, word) in words.iter().enumerate() {
            let is_positive = self.positive.contains(*word);
            let is_negative = self.negative.contains(*word);
            if !is_positive && !is_negative {
                continue;
            }

            let negated = negation_positions
                .iter()
                .any(|&neg_pos| neg_pos < i && (i - neg_pos) <= NEGATION_WINDOW);

            let polarity = if is_positive { 1 } else { -1 };
            score += if negated { -polarity } else { polarity };
            hits += 1;
        }

        if hits == 0 {
            0.0
        } else {
            score as f64 / hits as f64
        }
    }

    pub fn score_headline(&self, headline: &Headline) -> f64 {
        match &headline.description {
            Some(desc) => self.score_text(&format!("{} {}", headline.title, desc)),
            None => self.score_text(&headline.title),
        }
    }

    /// Mean headline polarity, one mention per headline.
    pub fn score_headlines(&self, headlines: &[Headline]) -> Result<SourceScore, AnalysisError> {
        if headlines.is_empty() {
            return Err(AnalysisError::SourceUnavailable("no headlines".to_string()));
        }
        let total: f64 = headlines.iter().map(|h| self.score_headline(h)).sum();
        Ok(SourceScore::new(
            total / headlines.len() as f64,
            headlines.len() as u32,
        ))
    }
}

/// Cheap local news scorer
pub struct LexiconNewsScorer<H: HeadlineSource> {
    headlines: H,
    lexicon: Lexicon,
}

impl<H: HeadlineSource> LexiconNewsScorer<H> {
    pub fn new(headlines: H) -> Self {
        Self { headlines, lexicon: Lexicon::financial() }
    }
}

#[async_trait]
impl<H: HeadlineSource> SourceScorer for LexiconNewsScorer<H> {
    fn kind(&self) -> SourceKind {
        SourceKind::News
    }

    async fn score(&self, symbol: &str) -> Result<SourceScore, AnalysisError> {
        let headlines = self.headlines.headlines(symbol).await?;
        let score = self.lexicon.score_headlines(&headlines)?;
        tracing::debug!(
            "Lexicon news score for {}: {:.3} over {} headlines",
            symbol,
            score.score,
            score.mention_count
        );
        Ok(score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headline(title: &str) -> Headline {
        Headline { title: title.to_string(), description: None, published_at: None }
    }

    #[test]
    fn test_positive_and_negative_text() {
        let lexicon = Lexicon::financial();
        assert_eq!(lexicon.score_text("Shares surge after record profit"), 1.0);
        assert_eq!(lexicon.score_text("Stock plunges on lawsuit fear"), -1.0);
        assert_eq!(lexicon.score_text("Company holds annual meeting"), 0.0);
    }

    #[test]
    fn test_negation_within_window_flips() {
        let lexicon = Lexicon::financial();
        assert_eq!(lexicon.score_text("results did not beat estimates"), -1.0);
        // negation four words back is out of range
        assert_eq!(lexicon.score_text("no one expected that strong quarter"), 1.0);
    }

    #[test]
    fn test_mixed_text_is_fractional() {
        let lexicon = Lexicon::financial();
        let score = lexicon.score_text("strong growth despite layoffs");
        assert!((score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_description_is_included() {
        let lexicon = Lexicon::financial();
        let h = Headline {
            title: "Quarterly update".to_string(),
            description: Some("Revenue beat expectations".to_string()),
            published_at: None,
        };
        assert_eq!(lexicon.score_headline(&h), 1.0);
    }

    #[test]
    fn test_headlines_average_and_mentions() {
        let lexicon = Lexicon::financial();
        let score = lexicon
            .score_headlines(&[headline("Bullish rally"), headline("Bearish slump"), headline("Rally")])
            .unwrap();
        assert!((score.score - 1.0 / 3.0).abs() < 1e-12);
        assert_eq!(score.mention_count, 3);
    }

    #[test]
    fn test_empty_headlines_unavailable() {
        assert!(matches!(
            Lexicon::financial().score_headlines(&[]),
            Err(AnalysisError::SourceUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_lexicon_scorer_reads_feed() {
        let feed = StaticHeadlines::new();
        feed.insert("aapl", vec![headline("Apple beats estimates"), headline("Apple upgrade")]);
        let scorer = LexiconNewsScorer::new(feed);

        assert_eq!(scorer.kind(), SourceKind::News);
        let score = scorer.score("AAPL").await.unwrap();
        assert_eq!(score.score, 1.0);
        assert_eq!(score.mention_count, 2);

        assert!(scorer.score("MSFT").await.is_err());
    }
}
