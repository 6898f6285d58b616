use std::time::Duration;

use onair_proto::protocol::Candidate;
use tracing::{info, warn};

use crate::error::{CandidateKind, PlayerError};
use crate::prober::Prober;

/// Probe `candidates` in ascending priority (ties keep list order) and
/// return the first one that answers. Lists are short and this only runs on
/// connect or after a failure, so probes go one at a time.
pub async fn select_candidate(
    candidates: &[Candidate],
    prober: &dyn Prober,
    timeout: Duration,
    kind: CandidateKind,
) -> Option<Candidate> {
    let mut ordered: Vec<&Candidate> = candidates.iter().collect();
    ordered.sort_by_key(|c| c.priority);

    for candidate in ordered {
        if prober.probe(&candidate.url, timeout).await {
            info!("failover: selected {} {}", kind, candidate.url);
            return Some(candidate.clone());
        }
        warn!(
            "{}",
            PlayerError::Probe {
                kind,
                url: candidate.url.clone()
            }
        );
    }

    warn!("{}", PlayerError::AllCandidatesExhausted(kind));
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeProber;

    fn candidates(list: &[(&str, i32)]) -> Vec<Candidate> {
        list.iter().map(|(u, p)| Candidate::new(*u, *p)).collect()
    }

    #[tokio::test]
    async fn picks_lowest_priority_reachable() {
        let prober = FakeProber::reachable(&["b", "c"]);
        let list = candidates(&[("c", 3), ("a", 1), ("b", 2)]);
        let picked = select_candidate(&list, &prober, Duration::from_secs(1), CandidateKind::Stream)
            .await
            .unwrap();
        assert_eq!(picked.url, "b");
        assert_eq!(prober.calls(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn ties_keep_list_order() {
        let prober = FakeProber::reachable(&["first", "second"]);
        let list = candidates(&[("first", 1), ("second", 1)]);
        let picked = select_candidate(&list, &prober, Duration::from_secs(1), CandidateKind::Api)
            .await
            .unwrap();
        assert_eq!(picked.url, "first");
        assert_eq!(prober.calls(), vec!["first"]);
    }

    #[tokio::test]
    async fn none_when_every_probe_fails() {
        let prober = FakeProber::reachable(&[]);
        let list = candidates(&[("a", 1), ("b", 2), ("c", 3)]);
        let picked =
            select_candidate(&list, &prober, Duration::from_secs(1), CandidateKind::Stream).await;
        assert!(picked.is_none());
        assert_eq!(prober.calls(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn result_is_minimum_priority_among_reachable() {
        // Exhaustive over reachability subsets of a three-element list.
        let list = candidates(&[("x", 5), ("y", -1), ("z", 2)]);
        let urls = ["x", "y", "z"];
        for mask in 0u8..8 {
            let reachable: Vec<&str> = urls
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, u)| *u)
                .collect();
            let prober = FakeProber::reachable(&reachable);
            let picked =
                select_candidate(&list, &prober, Duration::from_secs(1), CandidateKind::Stream)
                    .await;
            let expected = list
                .iter()
                .filter(|c| reachable.contains(&c.url.as_str()))
                .min_by_key(|c| c.priority)
                .map(|c| c.url.clone());
            assert_eq!(picked.map(|c| c.url), expected, "mask {:03b}", mask);
        }
    }
}
