//! Typed `JSONB` columns. A type listed in [`jsonb_column!`] is written as
//! Postgres binary jsonb (version byte + JSON text) and decoded back through
//! serde, so malformed documents fail at the row boundary.

macro_rules! jsonb_column {
    ($($name:ty),+ $(,)?) => {
        $(
            impl diesel::serialize::ToSql<diesel::sql_types::Jsonb, diesel::pg::Pg> for $name {
                fn to_sql<'b>(
                    &'b self,
                    out: &mut diesel::serialize::Output<'b, '_, diesel::pg::Pg>,
                ) -> diesel::serialize::Result {
                    std::io::Write::write_all(out, &[1])?;
                    serde_json::to_writer(out, self)?;
                    Ok(diesel::serialize::IsNull::No)
                }
            }

            impl diesel::deserialize::FromSql<diesel::sql_types::Jsonb, diesel::pg::Pg> for $name {
                fn from_sql(bytes: diesel::pg::PgValue<'_>) -> diesel::deserialize::Result<Self> {
                    let value = <serde_json::Value as diesel::deserialize::FromSql<
                        diesel::sql_types::Jsonb,
                        diesel::pg::Pg,
                    >>::from_sql(bytes)?;
                    Ok(serde_json::from_value(value)?)
                }
            }
        )+
    };
}

pub(crate) use jsonb_column;
