pub mod breed;

pub use breed::{
    BreedValidator, CatApiBreedValidator, StaticBreedValidator, UnavailableBreedValidator,
};
