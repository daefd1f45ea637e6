use crate::constants::{NEUTRAL_SENTIMENT, OLDEST_TEXT_WEIGHT};
use crate::models::{SentimentComponents, SentimentRecommendation};
use crate::services::feeds::NewsArticle;
use crate::services::lexicon::CryptoLexicon;

/// Polarity of a text in [-1, 1]
pub trait PolarityModel: Send + Sync {
    fn polarity(&self, text: &str) -> f64;
}

impl PolarityModel for CryptoLexicon {
    fn polarity(&self, text: &str) -> f64 {
        CryptoLexicon::polarity(self, text)
    }
}

/// Scores news and social texts into [0, 1], 0.5 being neutral
pub struct SentimentAnalyzer {
    model: Box<dyn PolarityModel>,
}

impl Default for SentimentAnalyzer {
    fn default() -> Self {
        Self::new(Box::new(CryptoLexicon::new()))
    }
}

impl SentimentAnalyzer {
    pub fn new(model: Box<dyn PolarityModel>) -> Self {
        Self { model }
    }

    /// `(polarity + 1) / 2`
    pub fn score_text(&self, text: &str) -> f64 {
        let polarity = self.model.polarity(text).clamp(-1.0, 1.0);
        (polarity + 1.0) / 2.0
    }

    /// Recency-weighted mean score of texts ordered oldest first
    ///
    /// Weights run linearly from 0.5 (oldest) to 1.0 (newest). Empty input
    /// is neutral.
    pub fn aggregate<S: AsRef<str>>(&self, texts: &[S]) -> f64 {
        if texts.is_empty() {
            return NEUTRAL_SENTIMENT;
        }

        let weights = recency_weights(texts.len());
        let weighted: f64 = texts
            .iter()
            .zip(&weights)
            .map(|(text, w)| self.score_text(text.as_ref()) * w)
            .sum();
        weighted / weights.iter().sum::<f64>()
    }

    /// Combined news and social sentiment
    ///
    /// Without social posts the news score stands alone; the social
    /// component is then reported as neutral but takes no part in the result.
    pub fn combine(&self, news: &[NewsArticle], social: &[String]) -> SentimentRecommendation {
        let news_texts: Vec<String> = news.iter().map(NewsArticle::text).collect();
        let news_score = self.aggregate(&news_texts);

        let (confidence, social_score) = if social.is_empty() {
            (news_score, NEUTRAL_SENTIMENT)
        } else {
            let social_score = self.aggregate(social);
            ((news_score + social_score) / 2.0, social_score)
        };

        SentimentRecommendation {
            confidence,
            components: SentimentComponents {
                news: news_score,
                social: social_score,
            },
        }
    }
}

/// `n` weights evenly spaced over [0.5, 1.0]; a single text gets 0.5
fn recency_weights(n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![OLDEST_TEXT_WEIGHT],
        _ => {
            let step = (1.0 - OLDEST_TEXT_WEIGHT) / (n - 1) as f64;
            (0..n).map(|i| OLDEST_TEXT_WEIGHT + step * i as f64).collect()
        }
    }
}
