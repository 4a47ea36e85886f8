//! Agent profiles, auto-assignment candidates and dashboard figures.

use sqlx::{Any, AnyPool, Executor};
use uuid::Uuid;

use souk_common::models::agent::{AgentProfile, KycStatus};

use crate::any_compat::{flag, id, now, opt_id};

pub async fn create_profile<'e, E>(db: E, user_id: Uuid) -> Result<AgentProfile, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let at = now();
    sqlx::query_as::<_, AgentProfile>(
        r#"
        INSERT INTO agent_profiles (user_id, kyc_status, is_available, completed_orders, created_at, updated_at)
        VALUES ($1, 'not_submitted', 0, 0, $2, $2)
        RETURNING *
        "#,
    )
    .bind(id(user_id))
    .bind(at)
    .fetch_one(db)
    .await
}

pub async fn find_profile<'e, E>(db: E, user_id: Uuid) -> Result<Option<AgentProfile>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query_as::<_, AgentProfile>("SELECT * FROM agent_profiles WHERE user_id = $1")
        .bind(id(user_id))
        .fetch_optional(db)
        .await
}

pub async fn set_availability(
    pool: &AnyPool,
    user_id: Uuid,
    is_available: bool,
    market_id: Option<Uuid>,
) -> Result<Option<AgentProfile>, sqlx::Error> {
    sqlx::query_as::<_, AgentProfile>(
        r#"
        UPDATE agent_profiles SET
            is_available = $2,
            market_id = COALESCE($3, market_id),
            updated_at = $4
        WHERE user_id = $1
        RETURNING *
        "#,
    )
    .bind(id(user_id))
    .bind(flag(is_available))
    .bind(opt_id(market_id))
    .bind(now())
    .fetch_optional(pool)
    .await
}

pub async fn set_kyc_status<'e, E>(db: E, user_id: Uuid, status: KycStatus) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query("UPDATE agent_profiles SET kyc_status = $2, updated_at = $3 WHERE user_id = $1")
        .bind(id(user_id))
        .bind(status.as_str())
        .bind(now())
        .execute(db)
        .await?;
    Ok(())
}

pub async fn increment_completed<'e, E>(db: E, user_id: Uuid) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    sqlx::query(
        "UPDATE agent_profiles SET completed_orders = completed_orders + 1, updated_at = $2 WHERE user_id = $1",
    )
    .bind(id(user_id))
    .bind(now())
    .execute(db)
    .await?;
    Ok(())
}

/// An agent eligible for new work and how many lists they are carrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub user_id: Uuid,
    pub market_id: Option<Uuid>,
    pub active_lists: i64,
}

/// Available, KYC-approved, active agents with their current load.
pub async fn assignment_candidates<'e, E>(db: E) -> Result<Vec<Candidate>, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let rows: Vec<(String, Option<String>, i64)> = sqlx::query_as(
        r#"
        SELECT a.user_id, a.market_id,
            (SELECT COUNT(*) FROM shopping_lists l
             WHERE l.agent_id = a.user_id
               AND l.status IN ('submitted', 'accepted', 'in_progress')) AS active_lists
        FROM agent_profiles a
        JOIN users u ON u.id = a.user_id
        WHERE a.is_available = 1
          AND a.kyc_status = 'approved'
          AND u.status = 'active'
          AND u.deleted_at IS NULL
        "#,
    )
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|(user_id, market_id, active_lists)| {
            Ok(Candidate {
                user_id: parse_uuid(&user_id)?,
                market_id: market_id.as_deref().map(parse_uuid).transpose()?,
                active_lists,
            })
        })
        .collect()
}

fn parse_uuid(s: &str) -> Result<Uuid, sqlx::Error> {
    Uuid::parse_str(s).map_err(|e| sqlx::Error::Decode(Box::new(e)))
}

/// Pick the least-loaded candidate, preferring agents based in `market_id`.
///
/// Ties break on the lower user ID so the choice is deterministic.
pub fn choose_agent(candidates: &[Candidate], market_id: Uuid, exclude: &[Uuid]) -> Option<Uuid> {
    let eligible = || {
        candidates
            .iter()
            .filter(move |c| !exclude.contains(&c.user_id))
    };
    least_loaded(eligible().filter(|c| c.market_id == Some(market_id)))
        .or_else(|| least_loaded(eligible()))
}

fn least_loaded<'a>(candidates: impl Iterator<Item = &'a Candidate>) -> Option<Uuid> {
    candidates
        .min_by_key(|c| (c.active_lists, c.user_id))
        .map(|c| c.user_id)
}

/// Delivery fees from the agent's completed orders.
pub async fn earnings<'e, E>(db: E, agent_id: Uuid) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Any>,
{
    let row: (i64,) = sqlx::query_as(
        r#"
        SELECT CAST(COALESCE(SUM(delivery_fee), 0) AS BIGINT) FROM orders
        WHERE agent_id = $1 AND status = 'completed'
        "#,
    )
    .bind(id(agent_id))
    .fetch_one(db)
    .await?;
    Ok(row.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(market: Option<Uuid>, active: i64) -> Candidate {
        Candidate {
            user_id: Uuid::now_v7(),
            market_id: market,
            active_lists: active,
        }
    }

    #[test]
    fn prefers_least_loaded_in_market() {
        let market = Uuid::now_v7();
        let busy = candidate(Some(market), 3);
        let idle = candidate(Some(market), 1);
        let elsewhere = candidate(None, 0);
        let all = vec![busy, idle.clone(), elsewhere];
        assert_eq!(choose_agent(&all, market, &[]), Some(idle.user_id));
    }

    #[test]
    fn falls_back_outside_market() {
        let market = Uuid::now_v7();
        let other = candidate(Some(Uuid::now_v7()), 2);
        let roaming = candidate(None, 1);
        let all = vec![other, roaming.clone()];
        assert_eq!(choose_agent(&all, market, &[]), Some(roaming.user_id));
    }

    #[test]
    fn excluded_agents_are_skipped() {
        let market = Uuid::now_v7();
        let decliner = candidate(Some(market), 0);
        let next = candidate(Some(market), 4);
        let all = vec![decliner.clone(), next.clone()];
        assert_eq!(choose_agent(&all, market, &[decliner.user_id]), Some(next.user_id));
        assert_eq!(
            choose_agent(&all, market, &[decliner.user_id, next.user_id]),
            None
        );
    }
}
