/*
 * Copyright Grantmine Contributors
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! End-to-end mining and reduction scenarios, run against the hermetic
//! sample backend.

use grantmine::ast::{AttrKey, Finding, Policy};
use grantmine::encode;
use grantmine::json::parse_policy;
use grantmine::miner::{mine, reduce};
use grantmine::relations::KvRelations;
use grantmine::symbolic::{SampleOracle, SymOracle};

const READ_BUCKET: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [{
        "Effect": "Allow",
        "Principal": {"AWS": ["*"]},
        "Action": ["s3:Get*", "s3:GetObject"],
        "Resource": ["arn:aws:s3:::bucket/*"]
    }]
}"#;

const READ_BUCKET_DENY_SECRET: &str = r#"{
    "Version": "2012-10-17",
    "Statement": [{
        "Effect": "Allow",
        "Principal": {"AWS": ["*"]},
        "Action": ["s3:Get*", "s3:GetObject"],
        "Resource": ["arn:aws:s3:::bucket/*"]
    }, {
        "Effect": "Deny",
        "Action": ["*"],
        "Resource": ["arn:aws:s3:::bucket/secret*"]
    }]
}"#;

fn entry(finding: &Finding, key: AttrKey) -> &str {
    finding.get(key).expect("key missing from finding")
}

#[test]
fn wildcard_read_policy_mines_one_maximal_finding() {
    let policy = parse_policy(READ_BUCKET).unwrap();
    let mut oracle = SampleOracle::new();
    let report = mine(&policy, &mut oracle).unwrap();

    // Refinement stops at "s3:Get*": the narrower "s3:GetObject" is also
    // fully permitted, so there is no boundary below the broader literal.
    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(entry(finding, AttrKey::Aws), "*");
    assert_eq!(entry(finding, AttrKey::Action), "s3:Get*");
    assert_eq!(entry(finding, AttrKey::Resource), "arn:aws:s3:::bucket/*");

    // One timing entry per worklist round, and the search visited more
    // than just the root.
    assert!(report.rounds.len() > 1);
}

#[test]
fn mining_is_sound() {
    let policy = parse_policy(READ_BUCKET_DENY_SECRET).unwrap();
    let mut oracle = SampleOracle::new();
    let report = mine(&policy, &mut oracle).unwrap();
    let policy_formula = encode::policy(&policy, &mut oracle).unwrap();

    for finding in &report.findings {
        let finding_formula = encode::finding(finding, &mut oracle);
        assert!(
            oracle
                .check_intersection(vec![policy_formula.clone(), finding_formula])
                .unwrap(),
            "finding {finding} does not intersect the policy"
        );
    }
}

#[test]
fn results_form_an_antichain() {
    let policy = parse_policy(READ_BUCKET_DENY_SECRET).unwrap();
    let mut oracle = SampleOracle::new();
    let report = mine(&policy, &mut oracle).unwrap();

    for (i, a) in report.findings.iter().enumerate() {
        for (j, b) in report.findings.iter().enumerate() {
            if i == j {
                continue;
            }
            let fa = encode::finding(a, &mut oracle);
            let fb = encode::finding(b, &mut oracle);
            assert!(
                !oracle.greater_equals(&fa, &fb).unwrap(),
                "finding {a} subsumes {b}"
            );
        }
    }
}

#[test]
fn deny_statement_keeps_the_denied_region_unclaimed() {
    let policy = parse_policy(READ_BUCKET_DENY_SECRET).unwrap();
    let mut oracle = SampleOracle::new();
    let relations = KvRelations::build(&policy, &mut oracle).unwrap();
    let report = grantmine::miner::mine_with_relations(&policy, &relations, &mut oracle).unwrap();

    // The denied literal itself is never an accepted finding.
    for finding in &report.findings {
        assert_ne!(entry(finding, AttrKey::Resource), "arn:aws:s3:::bucket/secret*");
    }

    // Each accepted finding's reduced region — the region it uniquely
    // claims, with its specializations subtracted — stays clear of the
    // deny predicate.
    let deny = oracle.mk_re_match("Resource", "arn:aws:s3:::bucket/secret*");
    for finding in &report.findings {
        let reduced = encode::reduced_finding(finding, &relations, &mut oracle);
        assert!(
            !oracle
                .check_intersection(vec![reduced, deny.clone()])
                .unwrap(),
            "reduced region of {finding} intersects the denied region"
        );
    }

    // And the permitted remainder below the deny boundary is still
    // claimed: the broad bucket finding survives.
    assert!(report
        .findings
        .iter()
        .any(|f| entry(f, AttrKey::Resource) == "arn:aws:s3:::bucket/*"));
}

#[test]
fn reduction_drops_subsumed_findings() {
    let policy = parse_policy(READ_BUCKET).unwrap();
    let mut oracle = SampleOracle::new();

    let broad = Finding::root(&policy).with_value(AttrKey::Action, "s3:Get*".into());
    let narrow = Finding::root(&policy).with_value(AttrKey::Action, "s3:GetObject".into());
    let narrow_resource = narrow.with_value(AttrKey::Resource, "arn:aws:s3:::bucket/*".into());

    let reduced = reduce(
        &policy,
        vec![broad.clone(), narrow, narrow_resource],
        &mut oracle,
    )
    .unwrap();
    assert_eq!(reduced.len(), 1);
    assert_eq!(entry(&reduced[0], AttrKey::Action), "s3:Get*");
}

#[test]
fn reduction_keeps_jointly_necessary_findings() {
    let policy = parse_policy(
        r#"{
        "Statement": [{
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["iam:List*", "s3:Get*"],
            "Resource": ["*"]
        }]
    }"#,
    )
    .unwrap();
    let mut oracle = SampleOracle::new();

    let listing = Finding::root(&policy).with_value(AttrKey::Action, "iam:List*".into());
    let reading = Finding::root(&policy).with_value(AttrKey::Action, "s3:Get*".into());

    let reduced = reduce(&policy, vec![listing, reading], &mut oracle).unwrap();
    assert_eq!(reduced.len(), 2);
}

#[test]
fn reduction_of_mined_findings_covers_the_policy() {
    let policy = parse_policy(READ_BUCKET).unwrap();
    let mut oracle = SampleOracle::new();
    let report = mine(&policy, &mut oracle).unwrap();
    let reduced = reduce(&policy, report.findings.clone(), &mut oracle).unwrap();

    // Reduction can only shrink the set, and never to nothing.
    assert!(!reduced.is_empty());
    assert!(reduced.len() <= report.findings.len());
    for finding in &reduced {
        assert!(report.findings.contains(finding));
    }
}

#[test]
fn empty_finding_set_reduces_to_nothing() {
    let policy = parse_policy(READ_BUCKET).unwrap();
    let mut oracle = SampleOracle::new();
    assert!(reduce(&policy, vec![], &mut oracle).unwrap().is_empty());
}

#[test]
fn source_ip_conditions_mine_through_the_cidr_lattice() {
    let policy = parse_policy(
        r#"{
        "Statement": [{
            "Effect": "Allow",
            "Principal": {"AWS": ["*"]},
            "Action": ["s3:Get*"],
            "Resource": ["*"],
            "Condition": {"IpAddress": {"aws:SourceIp": ["10.0.0.0/8"]}}
        }]
    }"#,
    )
    .unwrap();
    let mut oracle = SampleOracle::new();
    let report = mine(&policy, &mut oracle).unwrap();

    assert_eq!(report.findings.len(), 1);
    let finding = &report.findings[0];
    assert_eq!(entry(finding, AttrKey::SourceIp), "10.0.0.0/8");
    assert_eq!(entry(finding, AttrKey::Action), "s3:Get*");

    let policy_formula = encode::policy(&policy, &mut oracle).unwrap();
    let outside = oracle.mk_ip_match("aws:SourceIp", "192.168.0.1/32");
    assert!(!oracle
        .check_intersection(vec![policy_formula, outside])
        .unwrap());
}

#[test]
fn policy_without_statements_is_rejected() {
    let policy = Policy::new(None, vec![]);
    let mut oracle = SampleOracle::new();
    assert!(matches!(
        mine(&policy, &mut oracle),
        Err(grantmine::Error::NoStatements)
    ));
}
