//! Demo dataset loaded once per database.
//!
//! The `seeded` key in `store_meta` is claimed inside the seeding transaction,
//! so concurrent or repeated startups load the data at most once. A schema
//! reset drops the key along with everything else.

use chrono::Utc;
use shared::{ClubCategory, NewClub, NewReview, NewUser, UserRole};
use std::collections::BTreeSet;
use tracing::info;

use super::error::{StoreError, StoreResult};
use super::live_query::Table;
use super::rating;
use super::store::{ClubStore, WriteUnit};
use crate::backend::storage::{ClubRepository, MetaRepository, ReviewRepository, UserRepository};

pub(crate) const SEEDED_KEY: &str = "seeded";

const SEED_CITY: &str = "Муром";

struct SeedUser {
    role: UserRole,
    full_name: &'static str,
    phone: &'static str,
    password: &'static str,
}

const USERS: [SeedUser; 4] = [
    SeedUser {
        role: UserRole::Admin,
        full_name: "Администратор",
        phone: "admin",
        password: "admin123",
    },
    SeedUser {
        role: UserRole::Organizer,
        full_name: "Иванов Иван Иванович",
        phone: "89001234567",
        password: "123456",
    },
    SeedUser {
        role: UserRole::Parent,
        full_name: "Петрова Мария Сергеевна",
        phone: "89007654321",
        password: "123456",
    },
    SeedUser {
        role: UserRole::Child,
        full_name: "Петров Алексей",
        phone: "89009876543",
        password: "123456",
    },
];

// Indexes into USERS
const ORGANIZER: usize = 1;
const PARENT: usize = 2;
const CHILD: usize = 3;

struct SeedClub {
    name: &'static str,
    description: &'static str,
    category: ClubCategory,
    district: &'static str,
    address: &'static str,
    ages: (i32, i32),
    price_per_month: i64,
    schedule: &'static str,
    verified: bool,
}

const CLUBS: [SeedClub; 5] = [
    SeedClub {
        name: "Лыжные гонки",
        description: "Секция по лыжным гонкам для детей и подростков. Профессиональные тренеры, современное оборудование. Занятия проходят на свежем воздухе.",
        category: ClubCategory::Sport,
        district: "Центральный",
        address: "ул. Ленина, 15",
        ages: (6, 18),
        price_per_month: 2000,
        schedule: "Пн, Ср, Пт 16:00-18:00",
        verified: true,
    },
    SeedClub {
        name: "Рисование",
        description: "Студия рисования для детей. Акварель, гуашь, карандаши. Развиваем творческие способности и воображение.",
        category: ClubCategory::Art,
        district: "Южный",
        address: "ул. Пушкина, 25",
        ages: (4, 14),
        price_per_month: 1500,
        schedule: "Вт, Чт 15:00-17:00",
        verified: true,
    },
    SeedClub {
        name: "Робототехника",
        description: "Кружок робототехники и программирования. Lego, Arduino, Python. Участие в соревнованиях.",
        category: ClubCategory::It,
        district: "Центральный",
        address: "ул. Московская, 10",
        ages: (8, 16),
        price_per_month: 3000,
        schedule: "Сб 10:00-13:00",
        verified: false,
    },
    SeedClub {
        name: "Шахматы",
        description: "Шахматная школа для начинающих и продвинутых. Участие в турнирах, разряды.",
        category: ClubCategory::Science,
        district: "Северный",
        address: "ул. Гагарина, 5",
        ages: (5, 99),
        price_per_month: 1000,
        schedule: "Пн, Ср 17:00-19:00",
        verified: true,
    },
    SeedClub {
        name: "Современные танцы",
        description: "Hip-hop, breaking, contemporary. Для тех, кто хочет научиться танцевать современные стили.",
        category: ClubCategory::Dance,
        district: "Центральный",
        address: "ул. Карла Маркса, 30",
        ages: (7, 20),
        price_per_month: 2500,
        schedule: "Вт, Чт, Сб 18:00-20:00",
        verified: true,
    },
];

struct SeedReview {
    club: usize,
    author: usize,
    rating: i32,
    text: &'static str,
    reply: Option<&'static str>,
}

const REVIEWS: [SeedReview; 13] = [
    SeedReview {
        club: 0,
        author: PARENT,
        rating: 5,
        text: "Отличная секция! Сын занимается уже второй год, очень доволен. Тренеры внимательные и профессиональные.",
        reply: Some("Спасибо за отзыв! Рады, что вашему сыну нравится!"),
    },
    SeedReview {
        club: 0,
        author: CHILD,
        rating: 5,
        text: "Мне очень нравится! Тренировки интересные, уже участвовал в соревнованиях.",
        reply: None,
    },
    SeedReview {
        club: 0,
        author: PARENT,
        rating: 4,
        text: "Хорошая организация, но хотелось бы больше занятий в неделю.",
        reply: None,
    },
    SeedReview {
        club: 1,
        author: PARENT,
        rating: 5,
        text: "Дочка в восторге! Преподаватель умеет заинтересовать детей. Уже нарисовала целую выставку домой.",
        reply: Some("Благодарим за тёплые слова! Ждём вас на новых занятиях!"),
    },
    SeedReview {
        club: 1,
        author: CHILD,
        rating: 4,
        text: "Интересно учиться рисовать разными техниками.",
        reply: None,
    },
    SeedReview {
        club: 2,
        author: PARENT,
        rating: 5,
        text: "Лучший кружок по робототехнике в городе! Ребёнок научился программировать и собирать роботов.",
        reply: None,
    },
    SeedReview {
        club: 2,
        author: CHILD,
        rating: 5,
        text: "Супер! Мы даже участвовали в олимпиаде по робототехнике!",
        reply: None,
    },
    SeedReview {
        club: 2,
        author: PARENT,
        rating: 4,
        text: "Отличное оборудование, интересная программа. Немного дороговато, но оно того стоит.",
        reply: None,
    },
    SeedReview {
        club: 3,
        author: CHILD,
        rating: 5,
        text: "Научился играть с нуля! Теперь обыгрываю папу 😄",
        reply: None,
    },
    SeedReview {
        club: 3,
        author: PARENT,
        rating: 4,
        text: "Хороший преподаватель, терпеливый. Сын стал более усидчивым.",
        reply: None,
    },
    SeedReview {
        club: 4,
        author: CHILD,
        rating: 5,
        text: "Обожаю эти танцы! Хореограф очень крутой, учит современным движениям.",
        reply: None,
    },
    SeedReview {
        club: 4,
        author: PARENT,
        rating: 4,
        text: "Дочь ходит с удовольствием. Есть выступления на городских мероприятиях.",
        reply: None,
    },
    SeedReview {
        club: 4,
        author: CHILD,
        rating: 5,
        text: "Лучший танцевальный кружок! Атмосфера дружная, много концертов.",
        reply: None,
    },
];

/// Insert the seed users, reusing any account that already holds a seed phone
async fn seed_users(unit: &mut WriteUnit) -> StoreResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(USERS.len());
    for user in &USERS {
        let id = match UserRepository::find_by_phone(unit.conn(), user.phone).await? {
            Some(existing) => existing.id,
            None => {
                let new_user = NewUser {
                    role: user.role,
                    full_name: user.full_name.to_string(),
                    phone: user.phone.to_string(),
                    password: user.password.to_string(),
                    city: Some(SEED_CITY.to_string()),
                };
                UserRepository::insert(unit.conn(), &new_user, Utc::now()).await?
            }
        };
        ids.push(id);
    }
    unit.touch(Table::Users);
    Ok(ids)
}

async fn seed_clubs(unit: &mut WriteUnit, organizer_id: i64) -> StoreResult<Vec<i64>> {
    let mut ids = Vec::with_capacity(CLUBS.len());
    for club in &CLUBS {
        let new_club = NewClub {
            organizer_id,
            name: club.name.to_string(),
            description: club.description.to_string(),
            category: club.category,
            city: SEED_CITY.to_string(),
            district: Some(club.district.to_string()),
            address: club.address.to_string(),
            age_from: club.ages.0,
            age_to: club.ages.1,
            price_per_month: club.price_per_month,
            schedule: club.schedule.to_string(),
            image_ref: None,
            active: true,
        };
        let id = ClubRepository::insert(unit.conn(), &new_club, Utc::now()).await?;
        if club.verified {
            ClubRepository::set_verified(unit.conn(), id, true).await?;
        }
        ids.push(id);
    }
    unit.touch(Table::Clubs);
    Ok(ids)
}

async fn seed_reviews(unit: &mut WriteUnit, users: &[i64], clubs: &[i64]) -> StoreResult<BTreeSet<i64>> {
    let mut reviewed = BTreeSet::new();
    for review in &REVIEWS {
        let club_id = clubs[review.club];
        let new_review = NewReview {
            club_id,
            user_id: users[review.author],
            rating: review.rating,
            text: review.text.to_string(),
            approved: true,
        };
        let id = ReviewRepository::insert(unit.conn(), &new_review, Utc::now()).await?;
        if let Some(reply) = review.reply {
            ReviewRepository::set_reply(unit.conn(), id, reply).await?;
        }
        reviewed.insert(club_id);
    }
    unit.touch(Table::Reviews);
    Ok(reviewed)
}

impl ClubStore {
    /// Load the demo dataset unless this database was seeded before.
    ///
    /// Returns true when this call inserted the data.
    pub async fn ensure_seeded(&self) -> StoreResult<bool> {
        let seeded = self
            .run_write("ensure_seeded", |mut unit| async move {
                if !MetaRepository::claim(unit.conn(), SEEDED_KEY, &Utc::now().to_rfc3339()).await? {
                    return Ok((false, unit));
                }

                let users = seed_users(&mut unit).await?;
                let clubs = seed_clubs(&mut unit, users[ORGANIZER]).await?;
                let reviewed = seed_reviews(&mut unit, &users, &clubs).await?;
                rating::recompute_all(&mut unit, reviewed).await?;

                Ok::<_, StoreError>((true, unit))
            })
            .await?;

        if seeded {
            info!(
                "Seeded store with {} users, {} clubs, {} reviews",
                USERS.len(),
                CLUBS.len(),
                REVIEWS.len()
            );
        } else {
            info!("Store already seeded, skipping");
        }
        Ok(seeded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::test_utils::TestEnvironment;

    #[tokio::test]
    async fn test_seed_loads_demo_data_once() {
        let env = TestEnvironment::new().await;

        assert!(env.store.ensure_seeded().await.unwrap());
        assert!(!env.store.ensure_seeded().await.unwrap());

        assert_eq!(env.store.get_all_users().await.unwrap().len(), 4);
        assert_eq!(env.store.get_all_active_clubs().await.unwrap().len(), 5);
        assert_eq!(env.store.get_all_reviews().await.unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_concurrent_seeding_loads_once() {
        let env = TestEnvironment::new().await;

        let (a, b) = tokio::join!(env.store.ensure_seeded(), env.store.ensure_seeded());
        assert_ne!(a.unwrap(), b.unwrap());
        assert_eq!(env.store.get_all_reviews().await.unwrap().len(), 13);
    }

    #[tokio::test]
    async fn test_seeded_ratings_come_from_reviews() {
        let env = TestEnvironment::new().await;
        env.store.ensure_seeded().await.unwrap();

        let organizer = env.store.find_user_by_phone("89001234567").await.unwrap().unwrap();
        let clubs = env.store.get_clubs_by_organizer(organizer.id).await.unwrap();
        let summary: Vec<(&str, f64, i64, bool)> = clubs
            .iter()
            .map(|c| (c.name.as_str(), c.rating, c.review_count, c.verified))
            .collect();

        assert_eq!(
            summary,
            vec![
                ("Лыжные гонки", 4.7, 3, true),
                ("Рисование", 4.5, 2, true),
                ("Робототехника", 4.7, 3, false),
                ("Шахматы", 4.5, 2, true),
                ("Современные танцы", 4.7, 3, true),
            ]
        );

        let admin = env.store.authenticate("admin", "admin123").await.unwrap().unwrap();
        assert_eq!(admin.role, UserRole::Admin);
    }

    #[tokio::test]
    async fn test_seed_reuses_existing_accounts() {
        let env = TestEnvironment::new().await;
        env.store
            .create_user(NewUser {
                role: UserRole::Parent,
                full_name: "Уже зарегистрирована".to_string(),
                phone: "89007654321".to_string(),
                password: "own".to_string(),
                city: None,
            })
            .await
            .unwrap();

        assert!(env.store.ensure_seeded().await.unwrap());
        assert_eq!(env.store.get_all_users().await.unwrap().len(), 4);
    }
}
