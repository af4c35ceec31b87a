use crate::database::{Error, FilmDb, Result, UserDb};
use crate::model::*;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

/// Keeps every record in process memory, one lock per store.
#[derive(Default)]
pub struct MemoryDb {
    users: Mutex<BTreeMap<u64, User>>,
    films: Mutex<BTreeMap<u64, Film>>,
}

impl MemoryDb {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<T>(store: &Mutex<T>) -> Result<MutexGuard<'_, T>> {
    store.lock().map_err(|_| Error::Poisoned)
}

fn next_id<T>(records: &BTreeMap<u64, T>) -> u64 {
    records.keys().next_back().copied().unwrap_or(0) + 1
}

impl UserDb for MemoryDb {
    fn all_users(&self) -> Result<Vec<User>> {
        Ok(lock(&self.users)?.values().cloned().collect())
    }

    fn get_user(&self, id: u64) -> Result<Option<User>> {
        Ok(lock(&self.users)?.get(&id).cloned())
    }

    fn add_user(&self, mut user: User) -> Result<User> {
        let mut users = lock(&self.users)?;
        let id = next_id(&users);
        user.id = Some(id);
        users.insert(id, user.clone());
        Ok(user)
    }

    fn update_user(&self, user: &User) -> Result<Option<User>> {
        let mut users = lock(&self.users)?;
        let stored = match user.id {
            Some(id) => users.get_mut(&id),
            None => None,
        };
        Ok(stored.map(|stored| {
            stored.overwrite_profile(user);
            stored.clone()
        }))
    }

    fn edit_user_pair<F>(&self, a: u64, b: u64, edit: F) -> Result<Option<(User, User)>>
    where
        F: Fn(&mut User, &mut User),
    {
        let mut users = lock(&self.users)?;
        let (mut user_a, mut user_b) = match (users.get(&a), users.get(&b)) {
            (Some(user_a), Some(user_b)) => (user_a.clone(), user_b.clone()),
            _ => return Ok(None),
        };
        edit(&mut user_a, &mut user_b);
        users.insert(a, user_a.clone());
        users.insert(b, user_b.clone());
        Ok(Some((user_a, user_b)))
    }
}

impl FilmDb for MemoryDb {
    fn all_films(&self) -> Result<Vec<Film>> {
        Ok(lock(&self.films)?.values().cloned().collect())
    }

    fn get_film(&self, id: u64) -> Result<Option<Film>> {
        Ok(lock(&self.films)?.get(&id).cloned())
    }

    fn add_film(&self, mut film: Film) -> Result<Film> {
        let mut films = lock(&self.films)?;
        let id = next_id(&films);
        film.id = Some(id);
        films.insert(id, film.clone());
        Ok(film)
    }

    fn update_film(&self, film: &Film) -> Result<Option<Film>> {
        let mut films = lock(&self.films)?;
        let stored = match film.id {
            Some(id) => films.get_mut(&id),
            None => None,
        };
        Ok(stored.map(|stored| {
            stored.overwrite_details(film);
            stored.clone()
        }))
    }

    fn edit_film<F>(&self, id: u64, edit: F) -> Result<Option<Film>>
    where
        F: Fn(&mut Film),
    {
        let mut films = lock(&self.films)?;
        Ok(films.get_mut(&id).map(|stored| {
            edit(stored);
            stored.clone()
        }))
    }
}
