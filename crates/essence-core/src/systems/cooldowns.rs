//! Cooldown system - counts named timers down and drops finished ones

use crate::state::Cooldowns;

/// Reduce every cooldown by `elapsed` (closed form `max(0, c − t)`) and
/// remove the ones that reach zero. Returns the keys that expired.
pub fn cooldown_system(cooldowns: &mut Cooldowns, elapsed: f64) -> Vec<String> {
    let mut expired = Vec::new();
    for (key, remaining) in cooldowns.iter_mut() {
        *remaining = (*remaining - elapsed).max(0.0);
        if *remaining == 0.0 {
            expired.push(key.clone());
        }
    }
    cooldowns.retain(|_, remaining| *remaining > 0.0);
    expired
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cooldowns_count_down_and_expire() {
        let mut cooldowns = Cooldowns::new();
        cooldowns.insert("a".into(), 10.0);
        cooldowns.insert("b".into(), 3.0);

        let expired = cooldown_system(&mut cooldowns, 5.0);
        assert_eq!(expired, vec!["b".to_string()]);
        assert_eq!(cooldowns.get("a"), Some(&5.0));
        assert!(!cooldowns.contains_key("b"));
    }

    #[test]
    fn test_split_countdown_matches_single() {
        let mut once = Cooldowns::new();
        once.insert("a".into(), 10.0);
        let mut twice = once.clone();

        cooldown_system(&mut once, 7.0);
        cooldown_system(&mut twice, 3.0);
        cooldown_system(&mut twice, 4.0);
        assert_eq!(once, twice);
    }
}
