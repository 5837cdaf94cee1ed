use std::collections::BTreeMap;

use serenity::model::prelude::{RoleId, UserId};

/// Applies the guild's boosted-entity table to a base gain.
///
/// Every entry whose entity id is the member's own id, or one of the
/// member's role ids, multiplies the running value by `1 + bonus/100`,
/// flooring after each multiplication. Matching entries stack; iteration
/// is in ascending entity-id order so repeated credits round identically.
pub(crate) fn boosted_gain(
    gain: i64,
    member_id: UserId,
    member_roles: &[RoleId],
    boosts: &BTreeMap<i64, i64>,
) -> i64 {
    let mut value = gain;
    for (&entity_id, &bonus) in boosts {
        #[allow(clippy::cast_sign_loss)]
        let entity_id_u64 = core::convert::identity::<i64>(entity_id) as u64;
        let matches =
            entity_id_u64 == member_id.0 || member_roles.contains(&RoleId(entity_id_u64));
        if matches {
            #[allow(clippy::cast_possible_truncation)]
            {
                value = (value as f64 * (1.0 + bonus as f64 / 100.0)).floor() as i64;
            }
        }
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    const MEMBER: UserId = UserId(200);

    #[test]
    fn empty_table_is_identity() {
        let boosts = BTreeMap::new();
        for gain in [0, 1, 10, 25, 1000] {
            assert_eq!(boosted_gain(gain, MEMBER, &[RoleId(1)], &boosts), gain);
        }
    }

    #[test]
    fn non_matching_entries_are_ignored() {
        let boosts = BTreeMap::from([(300, 50), (400, 20)]);
        assert_eq!(boosted_gain(10, MEMBER, &[RoleId(1), RoleId(2)], &boosts), 10);
    }

    #[test]
    fn stacking_boosts_floor_sequentially() {
        // 20% then 50% on 10: floor(floor(10 * 1.2) * 1.5) = 18,
        // not floor(10 * 1.7) = 17.
        let boosts = BTreeMap::from([(1, 20), (2, 50)]);
        let roles = [RoleId(1), RoleId(2)];
        assert_eq!(boosted_gain(10, MEMBER, &roles, &boosts), 18);
    }

    #[test]
    fn member_id_entry_matches_without_roles() {
        let boosts = BTreeMap::from([(200, 100)]);
        assert_eq!(boosted_gain(10, MEMBER, &[], &boosts), 20);
    }

    #[test]
    fn role_and_member_entries_stack() {
        let boosts = BTreeMap::from([(7, 10), (200, 10)]);
        // floor(floor(10 * 1.1) * 1.1) = floor(11 * 1.1) = 12
        assert_eq!(boosted_gain(10, MEMBER, &[RoleId(7)], &boosts), 12);
    }
}
