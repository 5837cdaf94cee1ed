use core::convert::identity as id;
use std::cmp::Ordering;

use serenity::model::prelude::{GuildId, Member};
use sqlx::PgPool;

use crate::db::{self, dao};

/// Outcome of reconciling a guild's database roster against the member
/// list fetched from the gateway: who quit while the bot was offline, and
/// who joined.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Diff {
    quitters: Vec<i64>,
    newcomers: Vec<i64>,
}

impl Diff {
    pub(crate) fn of_members(db_info: &[dao::ServerMember], fetched_info: &[Member]) -> Self {
        let db_ids: Vec<i64> = db_info.iter().map(|sm| sm.discord_id).collect();
        #[allow(clippy::cast_possible_wrap)]
        let fetched_ids: Vec<i64> = fetched_info
            .iter()
            .map(|m| id::<u64>(m.user.id.0) as i64)
            .collect();
        Self::new(db_ids, fetched_ids)
    }

    /// Merge-join over both id lists; neither input is assumed sorted.
    fn new(mut db_ids: Vec<i64>, mut fetched_ids: Vec<i64>) -> Self {
        db_ids.sort_unstable();
        fetched_ids.sort_unstable();

        let mut quitters = Vec::new();
        let mut newcomers = Vec::new();

        let mut db_iter = db_ids.into_iter().peekable();
        let mut fetched_iter = fetched_ids.into_iter().peekable();

        loop {
            match (db_iter.peek(), fetched_iter.peek()) {
                (Some(db_id), Some(fetched_id)) => match i64::cmp(db_id, fetched_id) {
                    Ordering::Equal => {
                        db_iter.next();
                        fetched_iter.next();
                    }
                    Ordering::Less => {
                        quitters.push(db_iter.next().unwrap_or_else(|| unreachable!()));
                    }
                    Ordering::Greater => {
                        newcomers.push(fetched_iter.next().unwrap_or_else(|| unreachable!()));
                    }
                },
                (Some(_), None) => {
                    quitters.extend(db_iter);
                    break;
                }
                (None, Some(_)) => {
                    newcomers.extend(fetched_iter);
                    break;
                }
                (None, None) => break,
            }
        }

        Diff {
            quitters,
            newcomers,
        }
    }

    /// Writes the reconciliation back: quitters lose their `on_server`
    /// flag (their progress is kept), newcomers get their default row.
    pub(crate) async fn sync(self, pool: &PgPool, guild_id: GuildId) -> crate::error::Result<()> {
        db::mark_as_quitters(pool, guild_id, &self.quitters).await?;
        db::add_newcomers(pool, guild_id, &self.newcomers).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_rosters_produce_an_empty_diff() {
        let diff = Diff::new(vec![1, 2, 3], vec![1, 2, 3]);
        assert_eq!(
            diff,
            Diff {
                quitters: vec![],
                newcomers: vec![]
            }
        );
    }

    #[test]
    fn partitions_quitters_and_newcomers() {
        let diff = Diff::new(vec![1, 2, 5], vec![2, 3, 4]);
        assert_eq!(
            diff,
            Diff {
                quitters: vec![1, 5],
                newcomers: vec![3, 4]
            }
        );
    }

    #[test]
    fn unsorted_inputs_are_handled() {
        let diff = Diff::new(vec![5, 1, 2], vec![4, 2, 3]);
        assert_eq!(
            diff,
            Diff {
                quitters: vec![1, 5],
                newcomers: vec![3, 4]
            }
        );
    }

    #[test]
    fn empty_database_means_everyone_is_new() {
        let diff = Diff::new(vec![], vec![7, 8]);
        assert_eq!(
            diff,
            Diff {
                quitters: vec![],
                newcomers: vec![7, 8]
            }
        );
    }
}
