use tier_ranking::{
    bulk_rerank, max_comparisons, rank_new_item, sort_tiers, submit_comparison, Item,
    PendingItem, RankStep, Tier, TierBounds, TierLadder,
};

fn default_tiers() -> Vec<Tier> {
    vec![
        Tier::new("bad", "Bad", 3.33).with_color("#d9534f"),
        Tier::new("okay", "Okay", 6.66).with_color("#f0ad4e"),
        Tier::new("good", "Good", 10.0).with_color("#5cb85c"),
    ]
}

/// Evenly spread group of `n` items inside "good", ratings 7.0, 7.0 + d, ...
fn good_group(n: usize) -> Vec<Item> {
    (0..n)
        .map(|i| Item::new(format!("g{}", i), "good", 7.0 + i as f64 * (3.0 / (n.max(1) as f64))))
        .collect()
}

/// Drive a placement to the end, answering as a user whose opinion of the
/// new item equals `true_rating`.
fn place(group: &[Item], true_rating: f64) -> (usize, u32, Vec<String>) {
    let ladder = TierLadder::new(default_tiers()).unwrap();
    let mut step = rank_new_item(&ladder, "good", PendingItem::new("new"), group).unwrap();

    loop {
        match step {
            RankStep::Allocated(result) => {
                let ids: Vec<String> = result.assignments.iter().map(|a| a.item_id.clone()).collect();
                let index = ids.iter().position(|id| id == "new").unwrap();
                return (index, result.comparisons, ids);
            }
            RankStep::Compare(session) => {
                let pivot = session.pivot_item().unwrap();
                let better = true_rating >= pivot.rating;
                step = submit_comparison(session, better).unwrap();
            }
        }
    }
}

#[test]
fn insertion_matches_linear_scan() {
    for n in 0..=33 {
        let group = good_group(n);
        let mut candidates: Vec<f64> = group.iter().map(|item| item.rating).collect();
        candidates.extend(group.iter().map(|item| item.rating + 0.01));
        candidates.push(6.9);
        candidates.push(10.0);

        for candidate in candidates {
            let expected = group.iter().filter(|item| item.rating <= candidate).count();
            let (index, comparisons, ids) = place(&group, candidate);

            assert_eq!(index, expected, "n={} candidate={}", n, candidate);
            assert_eq!(ids.len(), n + 1);
            assert!(comparisons <= max_comparisons(n), "n={} used {}", n, comparisons);
        }
    }
}

#[test]
fn full_groups_use_exactly_log_comparisons() {
    for k in 1..=6u32 {
        let n = (1usize << k) - 1;
        let group = good_group(n);

        for candidate in [6.9, 8.5, 10.0] {
            let (_, comparisons, _) = place(&group, candidate);
            assert_eq!(comparisons, k, "n={}", n);
        }
    }
}

#[test]
fn scenario_empty_good_tier_rates_ten() {
    let ladder = TierLadder::new(default_tiers()).unwrap();
    let step = rank_new_item(&ladder, "good", PendingItem::new("new"), &[]).unwrap();

    match step {
        RankStep::Allocated(result) => {
            assert_eq!(result.assignments.len(), 1);
            assert_eq!(result.assignments[0].rating, 10.0);
        }
        RankStep::Compare(_) => panic!("empty tier needs no comparison"),
    }
}

#[test]
fn scenario_new_item_loses_to_three() {
    let group = vec![
        Item::new("seven", "good", 7.0),
        Item::new("eight", "good", 8.0),
        Item::new("nine", "good", 9.0),
    ];
    let ladder = TierLadder::new(default_tiers()).unwrap();

    let mut step = rank_new_item(&ladder, "good", PendingItem::new("new"), &group).unwrap();
    let result = loop {
        match step {
            RankStep::Allocated(result) => break result,
            RankStep::Compare(session) => step = submit_comparison(session, false).unwrap(),
        }
    };

    let ids: Vec<&str> = result.assignments.iter().map(|a| a.item_id.as_str()).collect();
    assert_eq!(ids, vec!["new", "seven", "eight", "nine"]);

    let expected = [7.495, 8.33, 9.165, 10.0];
    for (assignment, want) in result.assignments.iter().zip(expected) {
        assert!((assignment.rating - want).abs() < 1e-9);
    }
    assert_eq!(result.assignments[3].rating, 10.0);
}

#[test]
fn scenario_cutoff_move_changes_tier() {
    let items = vec![
        Item::new("steady", "bad", 1.0),
        Item::new("drifter", "okay", 4.0),
    ];
    let new_tiers = vec![
        Tier::new("bad", "Bad", 4.5),
        Tier::new("okay", "Okay", 7.0),
        Tier::new("good", "Good", 10.0),
    ];

    let outcome = bulk_rerank(&items, new_tiers).unwrap();
    let drifter = outcome
        .assignments
        .iter()
        .find(|a| a.item_id == "drifter")
        .unwrap();

    assert_ne!(drifter.tier_id, "okay");
    assert_eq!(drifter.tier_id, "bad");
    assert!(outcome.touch_updated_at);
}

#[test]
fn sorted_tiers_produce_sane_bounds() {
    let shuffled = vec![
        Tier::new("d", "D", 9.0),
        Tier::new("a", "A", 0.5),
        Tier::new("c", "C", 6.0),
        Tier::new("b", "B", 2.0),
    ];
    let ladder = TierLadder::new(shuffled.clone()).unwrap();
    let sorted = sort_tiers(shuffled).unwrap();

    assert!(sorted.windows(2).all(|w| w[0].cutoff <= w[1].cutoff));
    for tier in ladder.tiers() {
        let TierBounds { lower, upper } = ladder.bounds_of(&tier.id).unwrap();
        assert!(lower <= upper, "{} has inverted bounds", tier.id);
    }
}
