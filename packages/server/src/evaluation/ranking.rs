use std::cmp::Ordering;

use sea_orm::prelude::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder, TransactionSession,
    TransactionTrait,
};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::entity::{challenge, challenge_config, result};

pub const DEFAULT_SCORE_PATH: &str = "score";
pub const SORT_ASCENDING: &str = "ascending";
pub const SORT_DESCENDING: &str = "descending";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Lower scores rank higher.
    Ascending,
    /// Higher scores rank higher.
    Descending,
}

impl SortOrder {
    /// Anything other than `ascending` sorts descending.
    pub fn parse(raw: &str) -> Self {
        if raw.eq_ignore_ascii_case(SORT_ASCENDING) {
            SortOrder::Ascending
        } else {
            SortOrder::Descending
        }
    }
}

/// How one challenge orders its results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankSettings {
    pub score_path: String,
    pub order: SortOrder,
}

impl Default for RankSettings {
    fn default() -> Self {
        Self {
            score_path: DEFAULT_SCORE_PATH.to_string(),
            order: SortOrder::Descending,
        }
    }
}

impl From<&challenge_config::Model> for RankSettings {
    fn from(config: &challenge_config::Model) -> Self {
        Self {
            score_path: config.score_jsonpath.clone(),
            order: SortOrder::parse(&config.score_default_sort),
        }
    }
}

/// The parts of a result that ranking looks at.
#[derive(Debug, Clone, Copy)]
pub struct RankEntry<'a> {
    pub id: Uuid,
    pub public: bool,
    pub metrics: &'a Value,
}

/// Numeric value at a dot-separated `path` inside `metrics`.
///
/// Array elements are addressed by index (`cases.0.dice`). Leading `$.`
/// is accepted and ignored.
pub fn score_at(metrics: &Value, path: &str) -> Option<f64> {
    let path = path.strip_prefix("$.").unwrap_or(path);
    let mut current = metrics;
    for key in path.split('.').filter(|k| !k.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    current.as_f64()
}

/// Competition ranking of `entries`: equal scores share a rank and the next
/// rank skips accordingly (1, 1, 3). Private results and results without a
/// score get rank 0. Output order follows the input.
pub fn assign_ranks(entries: &[RankEntry<'_>], settings: &RankSettings) -> Vec<(Uuid, i32)> {
    let mut scored: Vec<(usize, f64)> = entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.public)
        .filter_map(|(i, e)| score_at(e.metrics, &settings.score_path).map(|s| (i, s)))
        .collect();

    scored.sort_by(|(_, a), (_, b)| {
        let ord = a.partial_cmp(b).unwrap_or(Ordering::Equal);
        match settings.order {
            SortOrder::Ascending => ord,
            SortOrder::Descending => ord.reverse(),
        }
    });

    let mut ranks = vec![0; entries.len()];
    let mut previous: Option<(f64, i32)> = None;
    for (position, (index, score)) in scored.into_iter().enumerate() {
        let rank = match previous {
            Some((prev_score, prev_rank)) if prev_score == score => prev_rank,
            _ => position as i32 + 1,
        };
        ranks[index] = rank;
        previous = Some((score, rank));
    }

    entries.iter().map(|e| e.id).zip(ranks).collect()
}

/// Recompute and store the ranks of every result of `challenge_id`.
///
/// Returns the number of results whose rank changed, or `None` when the
/// challenge does not exist. Ranks are written with column updates, so the
/// save dispatcher is not involved.
pub async fn recalculate<C>(db: &C, challenge_id: i32) -> Result<Option<usize>, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    if challenge::Entity::find_by_id(challenge_id)
        .one(db)
        .await?
        .is_none()
    {
        return Ok(None);
    }

    let settings = challenge_config::Entity::find()
        .filter(challenge_config::Column::ChallengeId.eq(challenge_id))
        .one(db)
        .await?
        .map(|config| RankSettings::from(&config))
        .unwrap_or_default();

    let txn = db.begin().await?;

    let results = result::Entity::find()
        .filter(result::Column::ChallengeId.eq(challenge_id))
        .order_by_asc(result::Column::CreatedAt)
        .all(&txn)
        .await?;

    let entries: Vec<RankEntry<'_>> = results
        .iter()
        .map(|r| RankEntry {
            id: r.id,
            public: r.public,
            metrics: &r.metrics,
        })
        .collect();

    let mut changed = 0;
    for ((id, rank), current) in assign_ranks(&entries, &settings).into_iter().zip(&results) {
        if current.rank == rank {
            continue;
        }
        result::Entity::update_many()
            .col_expr(result::Column::Rank, Expr::value(rank))
            .filter(result::Column::Id.eq(id))
            .exec(&txn)
            .await?;
        debug!(result_id = %id, rank, "Rank updated");
        changed += 1;
    }

    txn.commit().await?;

    info!(
        challenge_id,
        results = results.len(),
        changed,
        score_path = %settings.score_path,
        "Ranks recalculated"
    );
    Ok(Some(changed))
}
