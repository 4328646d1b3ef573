pub mod sea_orm_lookup;
