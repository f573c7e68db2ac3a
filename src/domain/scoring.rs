//! Entry scoring: indicator fusion into a bounded strength score.
//!
//! The score table is data: an ordered list of factors, each an ordered list
//! of (condition, points) tiers. Within a factor only the first matching tier
//! counts; factor results are summed. The total maps to an entry ratio through
//! a descending list of score thresholds.

use chrono::{Duration, NaiveDateTime};

use crate::domain::indicator::IndicatorFrame;
use crate::domain::trade::{TradeRecord, TradeType};

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    RsiBelow(f64),
    /// close < lower band × multiplier
    CloseBelowLowerBand { multiplier: f64 },
    /// Histogram negative and higher than on the previous bar.
    MacdHistogramRisingBelowZero,
    /// MACD line crossed above its signal line on this bar.
    MacdBullishCross,
    /// Short MA crossed above mid MA on this bar.
    ShortCrossesAboveMid,
    ShortAboveLong,
    /// Trend positive now and negative `lookback` bars ago.
    TrendReversal { lookback: usize },
    VolumeRatioAbove(f64),
    VolatilityAbove(f64),
}

fn gt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a > b)
}

fn lt(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a < b)
}

fn le(a: Option<f64>, b: Option<f64>) -> bool {
    matches!((a, b), (Some(a), Some(b)) if a <= b)
}

impl Condition {
    pub fn holds(&self, frame: &IndicatorFrame) -> bool {
        let latest = frame.latest();
        let prev = frame.previous();
        match self {
            Condition::RsiBelow(level) => lt(latest.rsi, Some(*level)),
            Condition::CloseBelowLowerBand { multiplier } => lt(
                Some(latest.close),
                latest.bollinger.map(|b| b.lower * multiplier),
            ),
            Condition::MacdHistogramRisingBelowZero => {
                latest.macd.histogram > prev.macd.histogram && latest.macd.histogram < 0.0
            }
            Condition::MacdBullishCross => {
                latest.macd.line > latest.macd.signal && prev.macd.line < prev.macd.signal
            }
            Condition::ShortCrossesAboveMid => {
                gt(latest.ma_short, latest.ma_mid) && le(prev.ma_short, prev.ma_mid)
            }
            Condition::ShortAboveLong => gt(latest.ma_short, latest.ma_long),
            Condition::TrendReversal { lookback } => {
                let earlier = frame.back(*lookback).and_then(|s| s.trend);
                gt(latest.trend, Some(0.0)) && lt(earlier, Some(0.0))
            }
            Condition::VolumeRatioAbove(level) => gt(latest.volume_ratio, Some(*level)),
            Condition::VolatilityAbove(level) => latest.volatility > *level,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreRule {
    pub condition: Condition,
    pub points: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorKind {
    Rsi,
    Bollinger,
    Macd,
    MovingAverage,
    TrendReversal,
    Volume,
    Volatility,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Factor {
    pub kind: FactorKind,
    /// Highest tier first; the first holding tier wins.
    pub tiers: Vec<ScoreRule>,
}

impl Factor {
    pub fn evaluate(&self, frame: &IndicatorFrame) -> i32 {
        self.tiers
            .iter()
            .find(|rule| rule.condition.holds(frame))
            .map_or(0, |rule| rule.points)
    }
}

fn rule(condition: Condition, points: i32) -> ScoreRule {
    ScoreRule { condition, points }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub factors: Vec<Factor>,
}

impl Default for ScoreTable {
    fn default() -> Self {
        ScoreTable {
            factors: vec![
                Factor {
                    kind: FactorKind::Rsi,
                    tiers: vec![
                        rule(Condition::RsiBelow(30.0), 30),
                        rule(Condition::RsiBelow(40.0), 20),
                        rule(Condition::RsiBelow(45.0), 10),
                    ],
                },
                Factor {
                    kind: FactorKind::Bollinger,
                    tiers: vec![
                        rule(Condition::CloseBelowLowerBand { multiplier: 1.0 }, 20),
                        rule(Condition::CloseBelowLowerBand { multiplier: 1.01 }, 15),
                    ],
                },
                Factor {
                    kind: FactorKind::Macd,
                    tiers: vec![
                        rule(Condition::MacdHistogramRisingBelowZero, 15),
                        rule(Condition::MacdBullishCross, 10),
                    ],
                },
                Factor {
                    kind: FactorKind::MovingAverage,
                    tiers: vec![
                        rule(Condition::ShortCrossesAboveMid, 15),
                        rule(Condition::ShortAboveLong, 10),
                    ],
                },
                Factor {
                    kind: FactorKind::TrendReversal,
                    tiers: vec![rule(Condition::TrendReversal { lookback: 5 }, 10)],
                },
                Factor {
                    kind: FactorKind::Volume,
                    tiers: vec![
                        rule(Condition::VolumeRatioAbove(1.5), 10),
                        rule(Condition::VolumeRatioAbove(1.2), 5),
                    ],
                },
                Factor {
                    kind: FactorKind::Volatility,
                    tiers: vec![
                        rule(Condition::VolatilityAbove(0.02), -20),
                        rule(Condition::VolatilityAbove(0.015), -10),
                    ],
                },
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub factors: Vec<(FactorKind, i32)>,
    pub total: i32,
}

impl ScoreBreakdown {
    pub fn points_for(&self, kind: FactorKind) -> i32 {
        self.factors
            .iter()
            .find(|(k, _)| *k == kind)
            .map_or(0, |(_, p)| *p)
    }
}

impl ScoreTable {
    pub fn score(&self, frame: &IndicatorFrame) -> ScoreBreakdown {
        let factors: Vec<(FactorKind, i32)> = self
            .factors
            .iter()
            .map(|f| (f.kind, f.evaluate(frame)))
            .collect();
        let total = factors.iter().map(|(_, p)| p).sum();
        ScoreBreakdown { factors, total }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioTier {
    pub min_score: i32,
    pub ratio: f64,
}

pub fn default_ratio_tiers() -> Vec<RatioTier> {
    vec![
        RatioTier { min_score: 70, ratio: 1.0 },
        RatioTier { min_score: 55, ratio: 0.7 },
        RatioTier { min_score: 40, ratio: 0.5 },
        RatioTier { min_score: 30, ratio: 0.3 },
    ]
}

/// Suppresses entries for a while after a losing trade.
#[derive(Debug, Clone, PartialEq)]
pub struct CooldownRule {
    /// Which record type's latest entry is inspected.
    pub record_type: TradeType,
    /// A roi strictly below this counts as a loss.
    pub loss_threshold: f64,
    pub window: Duration,
}

impl Default for CooldownRule {
    fn default() -> Self {
        CooldownRule {
            record_type: TradeType::Sell,
            loss_threshold: -0.02,
            window: Duration::minutes(5),
        }
    }
}

impl CooldownRule {
    pub fn is_active(&self, latest: Option<&TradeRecord>, now: NaiveDateTime) -> bool {
        let Some(record) = latest else {
            return false;
        };
        match record.roi {
            Some(roi) if roi < self.loss_threshold => now - record.executed_at < self.window,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    pub enter: bool,
    pub ratio: f64,
    /// `None` when the cooldown veto short-circuited scoring.
    pub score: Option<i32>,
}

impl EntrySignal {
    pub fn none() -> Self {
        EntrySignal {
            enter: false,
            ratio: 0.0,
            score: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntryScorer {
    pub table: ScoreTable,
    /// Descending by `min_score`.
    pub ratios: Vec<RatioTier>,
    pub cooldown: CooldownRule,
}

impl Default for EntryScorer {
    fn default() -> Self {
        EntryScorer {
            table: ScoreTable::default(),
            ratios: default_ratio_tiers(),
            cooldown: CooldownRule::default(),
        }
    }
}

impl EntryScorer {
    pub fn ratio_for(&self, score: i32) -> f64 {
        self.ratios
            .iter()
            .find(|tier| score >= tier.min_score)
            .map_or(0.0, |tier| tier.ratio)
    }

    /// Score the latest bar of `frame` and size the entry.
    pub fn evaluate(&self, frame: &IndicatorFrame) -> EntrySignal {
        let breakdown = self.table.score(frame);
        log::debug!("score breakdown: {:?}", breakdown.factors);

        let ratio = self.ratio_for(breakdown.total);
        if ratio > 0.0 {
            log::info!(
                "buy signal (score {}) -> {:.0}% entry",
                breakdown.total,
                ratio * 100.0
            );
        } else {
            log::info!("no buy signal (score {})", breakdown.total);
        }

        EntrySignal {
            enter: ratio > 0.0,
            ratio,
            score: Some(breakdown.total),
        }
    }

    /// Cooldown veto first, then scoring. `veto_record` is the latest record of
    /// the cooldown rule's record type.
    pub fn check_entry_signal(
        &self,
        veto_record: Option<&TradeRecord>,
        now: NaiveDateTime,
        frame: &IndicatorFrame,
    ) -> EntrySignal {
        if self.cooldown.is_active(veto_record, now) {
            log::warn!(
                "entry suppressed: losing {} within the last {} minutes",
                self.cooldown.record_type,
                self.cooldown.window.num_minutes()
            );
            return EntrySignal::none();
        }
        self.evaluate(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::{BollingerBands, IndicatorSnapshot, MacdValue};
    use crate::domain::test_util::{frame, minute, neutral};

    fn scorer() -> EntryScorer {
        EntryScorer::default()
    }

    fn with_rsi(rsi: f64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            rsi: Some(rsi),
            ..neutral(100.0)
        }
    }

    #[test]
    fn neutral_market_scores_zero() {
        let f = frame(neutral(100.0), neutral(100.0));
        let breakdown = ScoreTable::default().score(&f);
        assert_eq!(breakdown.total, 0);
        assert!(!scorer().evaluate(&f).enter);
    }

    #[test]
    fn rsi_tiers_do_not_stack() {
        let table = ScoreTable::default();
        let points = |rsi| {
            table
                .score(&frame(neutral(100.0), with_rsi(rsi)))
                .points_for(FactorKind::Rsi)
        };
        assert_eq!(points(25.0), 30);
        assert_eq!(points(35.0), 20);
        assert_eq!(points(42.0), 10);
        assert_eq!(points(45.0), 0);
    }

    #[test]
    fn missing_rsi_scores_nothing() {
        let latest = IndicatorSnapshot {
            rsi: None,
            ..neutral(100.0)
        };
        let breakdown = ScoreTable::default().score(&frame(neutral(100.0), latest));
        assert_eq!(breakdown.points_for(FactorKind::Rsi), 0);
    }

    #[test]
    fn bollinger_tiers() {
        let bands = Some(BollingerBands {
            lower: 100.0,
            middle: 105.0,
            upper: 110.0,
        });
        let below = IndicatorSnapshot {
            bollinger: bands,
            ..neutral(99.0)
        };
        let near = IndicatorSnapshot {
            bollinger: bands,
            ..neutral(100.5)
        };
        let table = ScoreTable::default();
        assert_eq!(
            table
                .score(&frame(neutral(100.0), below))
                .points_for(FactorKind::Bollinger),
            20
        );
        assert_eq!(
            table
                .score(&frame(neutral(100.0), near))
                .points_for(FactorKind::Bollinger),
            15
        );
    }

    #[test]
    fn macd_rising_histogram_beats_crossover() {
        let prev = IndicatorSnapshot {
            macd: MacdValue {
                line: -2.0,
                signal: -1.0,
                histogram: -1.0,
            },
            ..neutral(100.0)
        };
        let latest = IndicatorSnapshot {
            macd: MacdValue {
                line: -0.5,
                signal: -0.4,
                histogram: -0.1,
            },
            ..neutral(100.0)
        };
        let breakdown = ScoreTable::default().score(&frame(prev, latest));
        assert_eq!(breakdown.points_for(FactorKind::Macd), 15);
    }

    #[test]
    fn macd_bullish_crossover() {
        let prev = IndicatorSnapshot {
            macd: MacdValue {
                line: 0.1,
                signal: 0.2,
                histogram: 0.5,
            },
            ..neutral(100.0)
        };
        let latest = IndicatorSnapshot {
            macd: MacdValue {
                line: 0.3,
                signal: 0.2,
                histogram: 0.1,
            },
            ..neutral(100.0)
        };
        let breakdown = ScoreTable::default().score(&frame(prev, latest));
        assert_eq!(breakdown.points_for(FactorKind::Macd), 10);
    }

    #[test]
    fn moving_average_cross_and_alignment() {
        let prev = IndicatorSnapshot {
            ma_short: Some(99.0),
            ma_mid: Some(100.0),
            ..neutral(100.0)
        };
        let crossed = IndicatorSnapshot {
            ma_short: Some(101.0),
            ma_mid: Some(100.0),
            ma_long: Some(102.0),
            ..neutral(100.0)
        };
        let table = ScoreTable::default();
        assert_eq!(
            table
                .score(&frame(prev.clone(), crossed))
                .points_for(FactorKind::MovingAverage),
            15
        );

        let aligned = IndicatorSnapshot {
            ma_short: Some(101.0),
            ma_mid: Some(102.0),
            ma_long: Some(100.0),
            ..neutral(100.0)
        };
        assert_eq!(
            table
                .score(&frame(prev, aligned))
                .points_for(FactorKind::MovingAverage),
            10
        );
    }

    #[test]
    fn moving_average_cross_needs_previous_values() {
        let prev = IndicatorSnapshot {
            ma_short: None,
            ma_mid: None,
            ..neutral(100.0)
        };
        let latest = IndicatorSnapshot {
            ma_short: Some(101.0),
            ma_mid: Some(100.0),
            ma_long: None,
            ..neutral(100.0)
        };
        let breakdown = ScoreTable::default().score(&frame(prev, latest));
        assert_eq!(breakdown.points_for(FactorKind::MovingAverage), 0);
    }

    #[test]
    fn trend_reversal_looks_five_bars_back() {
        let mut snapshots: Vec<IndicatorSnapshot> = (0..8)
            .map(|i| IndicatorSnapshot {
                timestamp: minute(i),
                ..neutral(100.0)
            })
            .collect();
        snapshots[2].trend = Some(-0.01);
        snapshots[7].trend = Some(0.004);
        let f = IndicatorFrame::from_snapshots(snapshots).unwrap();
        let breakdown = ScoreTable::default().score(&f);
        assert_eq!(breakdown.points_for(FactorKind::TrendReversal), 10);
    }

    #[test]
    fn volume_and_volatility_tiers() {
        let table = ScoreTable::default();
        let score = |volume_ratio, volatility| {
            table.score(&frame(
                neutral(100.0),
                IndicatorSnapshot {
                    volume_ratio: Some(volume_ratio),
                    volatility,
                    ..neutral(100.0)
                },
            ))
        };
        assert_eq!(score(1.6, 0.0).points_for(FactorKind::Volume), 10);
        assert_eq!(score(1.3, 0.0).points_for(FactorKind::Volume), 5);
        assert_eq!(score(1.2, 0.0).points_for(FactorKind::Volume), 0);
        assert_eq!(score(1.0, 0.021).points_for(FactorKind::Volatility), -20);
        assert_eq!(score(1.0, 0.016).points_for(FactorKind::Volatility), -10);
        assert_eq!(score(1.0, 0.015).points_for(FactorKind::Volatility), 0);
    }

    #[test]
    fn penalties_can_make_total_negative() {
        let latest = IndicatorSnapshot {
            volatility: 0.05,
            ..neutral(100.0)
        };
        let breakdown = ScoreTable::default().score(&frame(neutral(100.0), latest));
        assert_eq!(breakdown.total, -20);
    }

    #[test]
    fn ratio_boundaries() {
        let s = scorer();
        assert_eq!(s.ratio_for(70), 1.0);
        assert_eq!(s.ratio_for(55), 0.7);
        assert_eq!(s.ratio_for(40), 0.5);
        assert_eq!(s.ratio_for(30), 0.3);
        assert_eq!(s.ratio_for(29), 0.0);
        assert_eq!(s.ratio_for(100), 1.0);
        assert_eq!(s.ratio_for(-20), 0.0);
    }

    #[test]
    fn ratio_is_monotonic() {
        let s = scorer();
        let mut last = 0.0;
        for score in -40..=110 {
            let ratio = s.ratio_for(score);
            assert!(ratio >= last, "ratio dropped at score {score}");
            last = ratio;
        }
    }

    #[test]
    fn strong_signal_enters_full_size() {
        let bands = Some(BollingerBands {
            lower: 100.0,
            middle: 105.0,
            upper: 110.0,
        });
        let latest = IndicatorSnapshot {
            rsi: Some(25.0),
            bollinger: bands,
            volume_ratio: Some(1.6),
            ma_short: Some(99.5),
            ma_mid: Some(100.0),
            ma_long: Some(99.0),
            ..neutral(99.0)
        };
        let signal = scorer().evaluate(&frame(neutral(100.0), latest));
        // 30 rsi + 20 band + 10 volume + 10 short above long
        assert_eq!(signal.score, Some(70));
        assert!(signal.enter);
        assert_eq!(signal.ratio, 1.0);
    }

    fn losing_buy(minutes_ago: i64, roi: f64) -> TradeRecord {
        TradeRecord {
            trade_type: TradeType::Buy,
            price: 100.0,
            amount: 1.0,
            roi: Some(roi),
            executed_at: minute(10 - minutes_ago),
            is_simulated: true,
            seed_balance_after: 1000.0,
        }
    }

    #[test]
    fn cooldown_veto_short_circuits_scoring() {
        let s = EntryScorer {
            cooldown: CooldownRule {
                record_type: TradeType::Buy,
                loss_threshold: 0.0,
                window: Duration::minutes(5),
            },
            ..scorer()
        };
        let strong = IndicatorSnapshot {
            rsi: Some(10.0),
            volume_ratio: Some(3.0),
            ..neutral(100.0)
        };
        let record = losing_buy(3, -0.03);
        let signal = s.check_entry_signal(Some(&record), minute(10), &frame(neutral(100.0), strong));
        assert_eq!(signal, EntrySignal::none());
    }

    #[test]
    fn cooldown_expires() {
        let rule = CooldownRule::default();
        let mut record = losing_buy(6, -0.05);
        record.trade_type = TradeType::Sell;
        assert!(!rule.is_active(Some(&record), minute(10)));
        record.executed_at = minute(6);
        assert!(rule.is_active(Some(&record), minute(10)));
    }

    #[test]
    fn cooldown_ignores_small_or_missing_losses() {
        let rule = CooldownRule::default();
        let mut record = losing_buy(1, -0.01);
        assert!(!rule.is_active(Some(&record), minute(10)));
        record.roi = None;
        assert!(!rule.is_active(Some(&record), minute(10)));
        assert!(!rule.is_active(None, minute(10)));
    }
}
