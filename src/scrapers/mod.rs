pub mod onehash;
