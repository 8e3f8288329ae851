//! Metrics aggregation.
//!
//! Groups email facts by department or team member and derives totals, average
//! response time and compliance rate. Pure: callers load the facts and the
//! group definitions, this module only counts.

use std::collections::HashMap;
use uuid::Uuid;

use crate::models::{
    Department, DepartmentMetrics, EmailFact, GroupMetrics, TeamMember, TeamMemberMetrics,
};

/// Compliance of an empty group.
pub const EMPTY_GROUP_COMPLIANCE_RATE: f64 = 100.0;

pub fn summarize<'a, I>(facts: I) -> GroupMetrics
where
    I: IntoIterator<Item = &'a EmailFact>,
{
    let mut total = 0i64;
    let mut replied = 0i64;
    let mut breaches = 0i64;
    let mut response_sum = 0.0f64;
    let mut response_count = 0i64;

    for fact in facts {
        total += 1;
        if fact.is_sla_breach {
            breaches += 1;
        }
        if fact.is_replied {
            replied += 1;
            if let Some(hours) = fact.response_time_hours {
                response_sum += hours;
                response_count += 1;
            }
        }
    }

    let avg_response_time_hours = if response_count > 0 {
        Some(response_sum / response_count as f64)
    } else {
        None
    };

    let sla_compliance_rate = if total > 0 {
        (total - breaches) as f64 / total as f64 * 100.0
    } else {
        EMPTY_GROUP_COMPLIANCE_RATE
    };

    GroupMetrics {
        total_emails: total,
        replied_emails: replied,
        pending_emails: total - replied,
        avg_response_time_hours,
        sla_breaches: breaches,
        sla_compliance_rate,
    }
}

fn group_by<F>(facts: &[EmailFact], key: F) -> HashMap<Uuid, Vec<&EmailFact>>
where
    F: Fn(&EmailFact) -> Option<Uuid>,
{
    let mut groups: HashMap<Uuid, Vec<&EmailFact>> = HashMap::new();
    for fact in facts {
        if let Some(id) = key(fact) {
            groups.entry(id).or_default().push(fact);
        }
    }
    groups
}

/// One row per department, in the order given. Departments without emails
/// still get a row.
pub fn aggregate_by_department(
    departments: &[Department],
    facts: &[EmailFact],
) -> Vec<DepartmentMetrics> {
    let groups = group_by(facts, |f| f.department_id);
    departments
        .iter()
        .map(|dept| {
            let metrics = groups
                .get(&dept.id)
                .map(|g| summarize(g.iter().copied()))
                .unwrap_or_else(|| summarize(std::iter::empty()));
            DepartmentMetrics {
                department_id: dept.id,
                department_name: dept.name.clone(),
                sla_threshold_hours: dept.sla_threshold_hours,
                metrics,
            }
        })
        .collect()
}

/// One row per member given. Which members to include (active only, or one
/// explicit member) is the caller's decision.
pub fn aggregate_by_team_member(
    members: &[TeamMember],
    departments: &[Department],
    facts: &[EmailFact],
) -> Vec<TeamMemberMetrics> {
    let groups = group_by(facts, |f| f.team_member_id);
    let department_names: HashMap<Uuid, &str> = departments
        .iter()
        .map(|d| (d.id, d.name.as_str()))
        .collect();

    members
        .iter()
        .map(|member| {
            let metrics = groups
                .get(&member.id)
                .map(|g| summarize(g.iter().copied()))
                .unwrap_or_else(|| summarize(std::iter::empty()));
            TeamMemberMetrics {
                team_member_id: member.id,
                team_member_name: member.name.clone(),
                team_member_email: member.email.clone(),
                department_id: member.department_id,
                department_name: department_names
                    .get(&member.department_id)
                    .map(|n| n.to_string()),
                is_active: member.is_active,
                metrics,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn fact(dept: Option<Uuid>, member: Option<Uuid>, reply: Option<f64>, breach: bool) -> EmailFact {
        EmailFact {
            department_id: dept,
            team_member_id: member,
            is_replied: reply.is_some(),
            response_time_hours: reply,
            is_sla_breach: breach,
        }
    }

    fn department(name: &str) -> Department {
        Department {
            id: Uuid::new_v4(),
            name: name.to_string(),
            sla_threshold_hours: 4.0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_group_is_fully_compliant() {
        let metrics = summarize(std::iter::empty());
        assert_eq!(metrics.total_emails, 0);
        assert_eq!(metrics.avg_response_time_hours, None);
        assert_eq!(metrics.sla_compliance_rate, 100.0);
    }

    #[test]
    fn compliance_rate_counts_breaches_over_total() {
        let facts = vec![
            fact(None, None, Some(1.0), false),
            fact(None, None, Some(5.0), true),
            fact(None, None, Some(3.0), false),
            fact(None, None, None, false),
        ];
        let metrics = summarize(&facts);
        assert_eq!(metrics.total_emails, 4);
        assert_eq!(metrics.replied_emails, 3);
        assert_eq!(metrics.pending_emails, 1);
        assert_eq!(metrics.sla_breaches, 1);
        assert_eq!(metrics.sla_compliance_rate, 75.0);
        assert_eq!(metrics.avg_response_time_hours, Some(3.0));
    }

    #[test]
    fn departments_without_emails_still_get_a_row() {
        let sales = department("Sales");
        let billing = department("Billing");
        let facts = vec![fact(Some(sales.id), None, Some(2.0), false)];

        let rows = aggregate_by_department(&[sales.clone(), billing.clone()], &facts);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].metrics.total_emails, 1);
        assert_eq!(rows[1].department_id, billing.id);
        assert_eq!(rows[1].metrics.total_emails, 0);
        assert_eq!(rows[1].metrics.sla_compliance_rate, 100.0);
    }

    #[test]
    fn member_rows_carry_department_name() {
        let support = department("Support");
        let member = TeamMember {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            app_password: None,
            department_id: support.id,
            is_active: true,
            created_at: Utc::now(),
        };
        let facts = vec![
            fact(Some(support.id), Some(member.id), Some(6.0), true),
            fact(Some(support.id), None, Some(1.0), false),
        ];

        let rows = aggregate_by_team_member(&[member.clone()], &[support], &facts);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].department_name.as_deref(), Some("Support"));
        assert_eq!(rows[0].metrics.total_emails, 1);
        assert_eq!(rows[0].metrics.sla_compliance_rate, 0.0);
    }
}
