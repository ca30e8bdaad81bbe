pub mod base;
pub mod supabase;

pub use base::Repository;
pub use supabase::SupabaseRepository;
