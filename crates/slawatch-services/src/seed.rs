//! Sample data for demos and local development.
//!
//! Seeds a fixed set of departments and team members plus a month of
//! client emails, most of them replied. Generation is deterministic so a
//! seeded store always produces the same metrics. Departments and members
//! that already exist are reused, so seeding twice only adds emails.

use std::sync::Arc;

use chrono::Duration;
use serde::Serialize;
use slawatch_core::{
    models::{CreateTeamMemberRequest, Department, NewEmail, ReplyUpdate, StoreCounts, TeamMember},
    sla::evaluate_reply,
    AppError, Clock,
};
use slawatch_db::SlaStore;
use utoipa::ToSchema;

const DEPARTMENTS: [(&str, f64); 5] = [
    ("Customer Support", 4.0),
    ("Sales", 2.0),
    ("Technical Support", 6.0),
    ("Billing", 4.0),
    ("Account Management", 8.0),
];

// (name, address, index into DEPARTMENTS)
const TEAM_MEMBERS: [(&str, &str, usize); 9] = [
    ("John Smith", "john.smith@company.example", 0),
    ("Sarah Johnson", "sarah.johnson@company.example", 0),
    ("Mike Davis", "mike.davis@company.example", 0),
    ("Emily Brown", "emily.brown@company.example", 1),
    ("David Wilson", "david.wilson@company.example", 1),
    ("Lisa Anderson", "lisa.anderson@company.example", 2),
    ("Robert Taylor", "robert.taylor@company.example", 2),
    ("Jennifer Martinez", "jennifer.martinez@company.example", 3),
    ("Michael Chen", "michael.chen@company.example", 4),
];

const CLIENTS: [&str; 10] = [
    "client1@example.com",
    "client2@example.com",
    "client3@example.com",
    "customer.support@example.com",
    "business.inquiry@example.com",
    "tech.help@example.com",
    "billing.dept@example.com",
    "sales.team@example.com",
    "info@example.com",
    "contact@example.com",
];

const SUBJECTS: [&str; 20] = [
    "Question about pricing plans",
    "Technical issue with login",
    "Request for refund processing",
    "Feature request: Dark mode",
    "Bug report: Dashboard not loading",
    "Account access problem - Urgent",
    "Invoice inquiry for order #12345",
    "Product demonstration request",
    "Complaint about delayed response",
    "Upgrade to premium plan",
    "Password reset not working",
    "Integration with third-party tools",
    "Data export functionality",
    "Mobile app availability",
    "API documentation request",
    "Billing discrepancy issue",
    "Contract renewal discussion",
    "Trial period extension request",
    "Feature comparison inquiry",
    "Custom solution requirements",
];

pub const SAMPLE_EMAIL_COUNT: usize = 100;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeedSummary {
    pub departments_created: usize,
    pub team_members_created: usize,
    pub emails_created: usize,
    pub emails_replied: usize,
    pub sla_breaches: usize,
    /// Store totals after seeding
    pub totals: StoreCounts,
}

#[derive(Clone)]
pub struct SampleDataSeeder {
    store: Arc<dyn SlaStore>,
    clock: Arc<dyn Clock>,
}

impl SampleDataSeeder {
    pub fn new(store: Arc<dyn SlaStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    #[tracing::instrument(skip(self))]
    pub async fn seed(&self) -> Result<SeedSummary, AppError> {
        let mut departments_created = 0;
        let mut departments: Vec<Department> = Vec::with_capacity(DEPARTMENTS.len());
        for (name, threshold) in DEPARTMENTS {
            let department = match self.store.find_department_by_name(name).await? {
                Some(existing) => existing,
                None => {
                    departments_created += 1;
                    self.store.create_department(name, threshold).await?
                }
            };
            departments.push(department);
        }

        let mut team_members_created = 0;
        let mut members: Vec<(TeamMember, f64)> = Vec::with_capacity(TEAM_MEMBERS.len());
        for (name, address, dept_index) in TEAM_MEMBERS {
            let department = &departments[dept_index];
            let member = match self.store.find_team_member_by_email(address).await? {
                Some(existing) => existing,
                None => {
                    team_members_created += 1;
                    self.store
                        .create_team_member(&CreateTeamMemberRequest {
                            name: name.to_string(),
                            email: address.to_string(),
                            app_password: None,
                            department_id: department.id,
                        })
                        .await?
                }
            };
            members.push((member, department.sla_threshold_hours));
        }

        let now = self.clock.now();
        let mut emails_replied = 0;
        let mut sla_breaches = 0;

        for i in 0..SAMPLE_EMAIL_COUNT {
            let (member, threshold) = &members[i % members.len()];
            let sender = CLIENTS[(i * 3) % CLIENTS.len()];
            let subject = SUBJECTS[(i * 7) % SUBJECTS.len()];
            // Spread over the last 30 days
            let received_at = now - Duration::minutes(((i * 431) % (30 * 24 * 60)) as i64);

            let email = self
                .store
                .insert_email(NewEmail {
                    sender: sender.to_string(),
                    recipient: member.email.clone(),
                    subject: subject.to_string(),
                    body: sample_body(&member.name, subject, sender),
                    team_member_id: Some(member.id),
                    department_id: Some(member.department_id),
                    received_at,
                    is_client_email: true,
                })
                .await?;

            // Three in four get a reply between 0.5 and 12 hours later
            if i % 4 == 3 {
                continue;
            }
            let reply_minutes = 30 + ((i * 37) % 691) as i64;
            let replied_at = received_at + Duration::minutes(reply_minutes);
            if replied_at > now {
                continue;
            }

            let evaluation = evaluate_reply(received_at, replied_at, *threshold);
            self.store
                .apply_reply(
                    email.id,
                    ReplyUpdate {
                        replied_at,
                        response_time_hours: evaluation.response_time_hours,
                        is_sla_breach: evaluation.is_sla_breach,
                    },
                )
                .await?;
            emails_replied += 1;
            if evaluation.is_sla_breach {
                sla_breaches += 1;
            }
        }

        let totals = self.store.counts().await?;
        tracing::info!(
            departments_created,
            team_members_created,
            emails_created = SAMPLE_EMAIL_COUNT,
            emails_replied,
            sla_breaches,
            "Sample data initialized"
        );

        Ok(SeedSummary {
            departments_created,
            team_members_created,
            emails_created: SAMPLE_EMAIL_COUNT,
            emails_replied,
            sla_breaches,
            totals,
        })
    }
}

fn sample_body(member_name: &str, subject: &str, sender: &str) -> String {
    let first_name = member_name.split_whitespace().next().unwrap_or(member_name);
    let signature = sender.split('@').next().unwrap_or(sender);
    format!(
        "Dear {},\n\n{}\n\nI would appreciate your assistance with this matter at your earliest convenience.\n\nBest regards,\n{}\n",
        first_name, subject, signature
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use slawatch_core::{models::EmailFilter, ManualClock};
    use slawatch_db::MemoryStore;

    fn seeder(store: Arc<MemoryStore>) -> SampleDataSeeder {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap());
        SampleDataSeeder::new(store, Arc::new(clock))
    }

    #[tokio::test]
    async fn seeds_directory_and_history() {
        let store = Arc::new(MemoryStore::new());
        let summary = seeder(store.clone()).seed().await.unwrap();

        assert_eq!(summary.departments_created, DEPARTMENTS.len());
        assert_eq!(summary.team_members_created, TEAM_MEMBERS.len());
        assert_eq!(summary.emails_created, SAMPLE_EMAIL_COUNT);
        assert!(summary.emails_replied > 0 && summary.emails_replied <= 75);
        assert!(summary.sla_breaches > 0 && summary.sla_breaches < summary.emails_replied);

        assert_eq!(summary.totals.departments, DEPARTMENTS.len() as i64);
        assert_eq!(summary.totals.team_members, TEAM_MEMBERS.len() as i64);
        assert_eq!(summary.totals.emails, SAMPLE_EMAIL_COUNT as i64);
        assert_eq!(summary.totals.replied_emails, summary.emails_replied as i64);
    }

    #[tokio::test]
    async fn replies_never_land_in_the_future() {
        let store = Arc::new(MemoryStore::new());
        let seeder = seeder(store.clone());
        seeder.seed().await.unwrap();

        let now = seeder.clock.now();
        let emails = store
            .list_emails(&EmailFilter {
                limit: 1000,
                ..EmailFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(emails.len(), SAMPLE_EMAIL_COUNT);
        for email in emails {
            assert!(email.received_at <= now);
            if let Some(replied_at) = email.replied_at {
                assert!(replied_at <= now);
                assert!(email.is_replied);
            }
        }
    }

    #[tokio::test]
    async fn seeding_twice_reuses_directory() {
        let store = Arc::new(MemoryStore::new());
        let seeder = seeder(store.clone());
        seeder.seed().await.unwrap();

        let second = seeder.seed().await.unwrap();
        assert_eq!(second.departments_created, 0);
        assert_eq!(second.team_members_created, 0);
        assert_eq!(second.totals.departments, DEPARTMENTS.len() as i64);
        assert_eq!(second.totals.emails, 2 * SAMPLE_EMAIL_COUNT as i64);
    }
}
