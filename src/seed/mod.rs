//! Synthetic fixture generation.
//!
//! Produces a fresh cohort of employees with screening history on every run.
//! Ids are random, so repeated runs accumulate cohorts; this is a fixture
//! tool, not a migration.

use chrono::{DateTime, Datelike, Duration, Utc};
use futures::future::{self, BoxFuture};
use rand::Rng;
use uuid::Uuid;

use crate::models::{Gender, HealthRecord, Position, Prediction, Role, User, UserStatus};
use crate::risk::classify;
use crate::store::{DocumentStore, StoreError};

pub const SEED_USER_COUNT: usize = 25;
pub const MIN_RECORDS: u32 = 3;
pub const MAX_RECORDS: u32 = 10;

pub const POSITIONS: [Position; 7] = [
    Position::Driver,
    Position::Cook,
    Position::Chef,
    Position::KitchenHelper,
    Position::TruckDriver,
    Position::Baker,
    Position::FoodTester,
];

const FEMALE_NAMES: [&str; 10] = [
    "Amara", "Beatriz", "Chioma", "Dora", "Elif", "Fatima", "Greta", "Hana", "Ingrid", "Joana",
];
const MALE_NAMES: [&str; 10] = [
    "Andre", "Boris", "Carlos", "Diego", "Emre", "Felix", "Gustav", "Henrik", "Ivan", "Jonas",
];
const SURNAMES: [&str; 12] = [
    "Almeida", "Bauer", "Costa", "Duarte", "Eriksen", "Fischer", "Gomes", "Haddad", "Ilic",
    "Jensen", "Keller", "Lopes",
];

/// One seeded employee plus their screening history.
pub struct SeedEmployee {
    pub user: User,
    pub records: Vec<HealthRecord>,
}

pub fn generate_employee<R: Rng + ?Sized>(
    rng: &mut R,
    index: usize,
    now: DateTime<Utc>,
) -> SeedEmployee {
    let gender = if rng.random_bool(0.5) {
        Gender::Female
    } else {
        Gender::Male
    };
    let first = match gender {
        Gender::Female => FEMALE_NAMES[rng.random_range(0..FEMALE_NAMES.len())],
        Gender::Male => MALE_NAMES[rng.random_range(0..MALE_NAMES.len())],
    };
    let last = SURNAMES[rng.random_range(0..SURNAMES.len())];

    // Day capped at 28 so every month is valid.
    let birth_year = rng.random_range(1960..=2000);
    let birth_month = rng.random_range(1..=12);
    let birth_day = rng.random_range(1..=28);
    let age = i64::from(now.year() - birth_year);

    let user = User {
        id: Uuid::new_v4().to_string(),
        email: format!(
            "{}.{}{index}@corpmail.example",
            first.to_lowercase(),
            last.to_lowercase()
        ),
        name: format!("{first} {last}"),
        gender,
        birthdate: format!("{birth_year:04}-{birth_month:02}-{birth_day:02}"),
        role: Role::Employee,
        status: UserStatus::Active,
        position: Some(POSITIONS[rng.random_range(0..POSITIONS.len())]),
        created_at: None,
        updated_at: None,
    };

    let count = rng.random_range(MIN_RECORDS..=MAX_RECORDS);
    let records = (0..count)
        .map(|_| generate_record(rng, &user.id, gender, age, now))
        .collect();

    SeedEmployee { user, records }
}

fn generate_record<R: Rng + ?Sized>(
    rng: &mut R,
    user_id: &str,
    gender: Gender,
    age: i64,
    now: DateTime<Utc>,
) -> HealthRecord {
    let pregnancies = match gender {
        Gender::Female => rng.random_range(0..=5),
        Gender::Male => 0,
    };
    let glucose = rng.random_range(70..=200);
    let bmi = (rng.random_range(18.0..=40.0) * 10.0_f64).round() / 10.0;
    let probability = (rng.random_range(0.10..=0.90) * 100.0_f64).round() / 100.0;

    HealthRecord {
        id: String::new(),
        user_id: user_id.to_string(),
        timestamp: now - Duration::days(rng.random_range(1..=180)),
        pregnancies,
        glucose,
        blood_pressure: rng.random_range(60..=140),
        insulin: rng.random_range(0..=200),
        bmi,
        age,
        prediction: Prediction {
            probability,
            risk_level: classify(glucose, bmi),
        },
    }
}

/// Generate the cohort and write everything. All writes go out concurrently;
/// the run completes when every write has acknowledged. A failed write aborts
/// the batch without rolling back what already landed.
pub async fn run(store: &dyn DocumentStore) -> anyhow::Result<()> {
    let now = Utc::now();
    let mut rng = rand::rng();
    let cohort: Vec<SeedEmployee> = (0..SEED_USER_COUNT)
        .map(|i| generate_employee(&mut rng, i, now))
        .collect();

    let mut writes: Vec<BoxFuture<'_, Result<(), StoreError>>> = Vec::new();
    for employee in &cohort {
        writes.push(store.create_user(&employee.user));
        for record in &employee.records {
            writes.push(store.insert_health_record(record));
        }
    }

    let total = writes.len();
    if let Err(e) = future::try_join_all(writes).await {
        tracing::error!("Seeding aborted, cohort may be partially written: {e}");
        return Err(e.into());
    }

    tracing::info!(
        users = SEED_USER_COUNT,
        writes = total,
        "Seed cohort written"
    );
    Ok(())
}
