use crate::database::{FilmDb, UserDb};
use crate::error::{ServiceError, ServiceResult};
use crate::model::Film;
use log::info;
use std::collections::BTreeSet;
use validator::Validate;

pub const DEFAULT_POPULAR_COUNT: usize = 10;

pub struct FilmService<'a, D> {
    db: &'a D,
}

impl<'a, D: FilmDb> FilmService<'a, D> {
    pub fn new(db: &'a D) -> Self {
        FilmService { db }
    }

    pub fn find_all(&self) -> ServiceResult<Vec<Film>> {
        Ok(self.db.all_films()?)
    }

    pub fn get_by_id(&self, id: u64) -> ServiceResult<Film> {
        self.db
            .get_film(id)?
            .ok_or_else(|| ServiceError::film_not_found(id))
    }

    pub fn create(&self, film: Film) -> ServiceResult<Film> {
        film.validate()?;
        let film = self.db.add_film(Film {
            id: None,
            likes: BTreeSet::new(),
            ..film
        })?;
        info!("Created film {:?} with id {:?}", film.name, film.id);
        Ok(film)
    }

    pub fn update(&self, film: Film) -> ServiceResult<Film> {
        let id = film
            .id
            .ok_or_else(|| ServiceError::validation("id must be specified"))?;
        film.validate()?;
        let film = self
            .db
            .update_film(&film)?
            .ok_or_else(|| ServiceError::film_not_found(id))?;
        info!("Updated film {}", id);
        Ok(film)
    }
}

/// Like edges from users to films, and the popularity ranking built on them.
pub struct LikeService<'a, D> {
    db: &'a D,
}

impl<'a, D: FilmDb + UserDb> LikeService<'a, D> {
    pub fn new(db: &'a D) -> Self {
        LikeService { db }
    }

    fn ensure_user(&self, user_id: u64) -> ServiceResult<()> {
        match self.db.get_user(user_id)? {
            Some(_) => Ok(()),
            None => Err(ServiceError::user_not_found(user_id)),
        }
    }

    pub fn add_like(&self, film_id: u64, user_id: u64) -> ServiceResult<()> {
        self.ensure_user(user_id)?;
        self.db
            .edit_film(film_id, |film| {
                film.likes.insert(user_id);
            })?
            .ok_or_else(|| ServiceError::film_not_found(film_id))?;
        info!("User {} liked film {}", user_id, film_id);
        Ok(())
    }

    pub fn remove_like(&self, film_id: u64, user_id: u64) -> ServiceResult<()> {
        self.ensure_user(user_id)?;
        self.db
            .edit_film(film_id, |film| {
                film.likes.remove(&user_id);
            })?
            .ok_or_else(|| ServiceError::film_not_found(film_id))?;
        info!("User {} removed like from film {}", user_id, film_id);
        Ok(())
    }

    /// Films ordered by like count, most liked first. Equal counts keep id order.
    pub fn get_most_popular(&self, count: usize) -> ServiceResult<Vec<Film>> {
        let mut films = self.db.all_films()?;
        films.sort_by(|a, b| b.likes.len().cmp(&a.likes.len()));
        films.truncate(count);
        Ok(films)
    }
}
