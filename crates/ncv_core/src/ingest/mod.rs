pub mod batch_csv;
pub mod corpus;
