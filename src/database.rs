use crate::model::*;
use serde::{de::DeserializeOwned, Serialize};
use sled::transaction::{
    ConflictableTransactionError, ConflictableTransactionResult, TransactionError,
    TransactionalTree,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),
    #[error("record encoding error: {0}")]
    Codec(#[from] bincode::Error),
    #[error("malformed record key: {0:?}")]
    MalformedKey(Vec<u8>),
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<TransactionError<Error>> for Error {
    fn from(err: TransactionError<Error>) -> Self {
        match err {
            TransactionError::Abort(e) => e,
            TransactionError::Storage(e) => Error::Sled(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait UserDb {
    fn all_users(&self) -> Result<Vec<User>>;
    fn get_user(&self, id: u64) -> Result<Option<User>>;
    /// Stores `user` under the next free id and returns it with the id set.
    fn add_user(&self, user: User) -> Result<User>;
    /// Replaces the profile fields of an existing user; `None` if absent.
    fn update_user(&self, user: &User) -> Result<Option<User>>;
    /// Applies `edit` to both users in one step; `None` if either is absent.
    fn edit_user_pair<F>(&self, a: u64, b: u64, edit: F) -> Result<Option<(User, User)>>
    where
        F: Fn(&mut User, &mut User);
}

pub trait FilmDb {
    fn all_films(&self) -> Result<Vec<Film>>;
    fn get_film(&self, id: u64) -> Result<Option<Film>>;
    fn add_film(&self, film: Film) -> Result<Film>;
    fn update_film(&self, film: &Film) -> Result<Option<Film>>;
    fn edit_film<F>(&self, id: u64, edit: F) -> Result<Option<Film>>
    where
        F: Fn(&mut Film);
}

/// Everything the services and handlers need from a backend.
pub trait Storage: UserDb + FilmDb + Send + Sync + 'static {}

impl<T: UserDb + FilmDb + Send + Sync + 'static> Storage for T {}

const USERS: &'static [u8] = b"users";
const FILMS: &'static [u8] = b"films";

// Big-endian so that tree order is id order and `last()` is the max id.
fn serialize_id(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

fn deserialize_id<V: AsRef<[u8]>>(id: V) -> Result<u64> {
    use std::convert::TryInto;
    let key = id.as_ref();
    key.try_into()
        .map(u64::from_be_bytes)
        .map_err(|_| Error::MalformedKey(key.to_vec()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> ConflictableTransactionResult<T, Error> {
    bincode::deserialize(bytes).map_err(|e| ConflictableTransactionError::Abort(Error::Codec(e)))
}

fn encode<T: Serialize>(record: &T) -> ConflictableTransactionResult<Vec<u8>, Error> {
    bincode::serialize(record).map_err(|e| ConflictableTransactionError::Abort(Error::Codec(e)))
}

fn all<T: DeserializeOwned>(tree: &sled::Tree) -> Result<Vec<T>> {
    tree.iter()
        .values()
        .map(|value| -> Result<T> { Ok(bincode::deserialize(&value?)?) })
        .collect()
}

fn get<T: DeserializeOwned>(tree: &sled::Tree, id: u64) -> Result<Option<T>> {
    match tree.get(&serialize_id(id)[..])? {
        Some(value) => Ok(Some(bincode::deserialize(&value)?)),
        None => Ok(None),
    }
}

/// Claims `max id + 1` with a compare-and-swap, retrying if another writer
/// took the same id first.
fn insert_next<T, F>(tree: &sled::Tree, assign: F) -> Result<T>
where
    T: Serialize,
    F: Fn(u64) -> T,
{
    loop {
        let id = match tree.last()? {
            Some((key, _)) => deserialize_id(key)? + 1,
            None => 1,
        };
        let record = assign(id);
        let value = bincode::serialize(&record)?;
        if tree
            .compare_and_swap(&serialize_id(id)[..], None as Option<&[u8]>, Some(value))?
            .is_ok()
        {
            return Ok(record);
        }
    }
}

fn edit_one<T, F>(tree: &sled::Tree, id: u64, edit: F) -> Result<Option<T>>
where
    T: Serialize + DeserializeOwned,
    F: Fn(&mut T),
{
    let key = serialize_id(id);
    let result = tree.transaction(
        |tx: &TransactionalTree| -> ConflictableTransactionResult<Option<T>, Error> {
            let mut record: T = match tx.get(&key[..])? {
                Some(value) => decode(&value)?,
                None => return Ok(None),
            };
            edit(&mut record);
            tx.insert(&key[..], encode(&record)?)?;
            Ok(Some(record))
        },
    )?;
    Ok(result)
}

impl UserDb for sled::Db {
    fn all_users(&self) -> Result<Vec<User>> {
        all(&self.open_tree(USERS)?)
    }

    fn get_user(&self, id: u64) -> Result<Option<User>> {
        get(&self.open_tree(USERS)?, id)
    }

    fn add_user(&self, user: User) -> Result<User> {
        let users = self.open_tree(USERS)?;
        insert_next(&users, |id| User {
            id: Some(id),
            ..user.clone()
        })
    }

    fn update_user(&self, user: &User) -> Result<Option<User>> {
        let id = match user.id {
            Some(id) => id,
            None => return Ok(None),
        };
        edit_one(&self.open_tree(USERS)?, id, |stored: &mut User| {
            stored.overwrite_profile(user)
        })
    }

    fn edit_user_pair<F>(&self, a: u64, b: u64, edit: F) -> Result<Option<(User, User)>>
    where
        F: Fn(&mut User, &mut User),
    {
        let users = self.open_tree(USERS)?;
        let (key_a, key_b) = (serialize_id(a), serialize_id(b));
        let result = users.transaction(
            |tx: &TransactionalTree| -> ConflictableTransactionResult<Option<(User, User)>, Error> {
                let (value_a, value_b) = match (tx.get(&key_a[..])?, tx.get(&key_b[..])?) {
                    (Some(value_a), Some(value_b)) => (value_a, value_b),
                    _ => return Ok(None),
                };
                let mut user_a: User = decode(&value_a)?;
                let mut user_b: User = decode(&value_b)?;
                edit(&mut user_a, &mut user_b);
                tx.insert(&key_a[..], encode(&user_a)?)?;
                tx.insert(&key_b[..], encode(&user_b)?)?;
                Ok(Some((user_a, user_b)))
            },
        )?;
        Ok(result)
    }
}

impl FilmDb for sled::Db {
    fn all_films(&self) -> Result<Vec<Film>> {
        all(&self.open_tree(FILMS)?)
    }

    fn get_film(&self, id: u64) -> Result<Option<Film>> {
        get(&self.open_tree(FILMS)?, id)
    }

    fn add_film(&self, film: Film) -> Result<Film> {
        let films = self.open_tree(FILMS)?;
        insert_next(&films, |id| Film {
            id: Some(id),
            ..film.clone()
        })
    }

    fn update_film(&self, film: &Film) -> Result<Option<Film>> {
        let id = match film.id {
            Some(id) => id,
            None => return Ok(None),
        };
        edit_one(&self.open_tree(FILMS)?, id, |stored: &mut Film| {
            stored.overwrite_details(film)
        })
    }

    fn edit_film<F>(&self, id: u64, edit: F) -> Result<Option<Film>>
    where
        F: Fn(&mut Film),
    {
        edit_one(&self.open_tree(FILMS)?, id, edit)
    }
}
