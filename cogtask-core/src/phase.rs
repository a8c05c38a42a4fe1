/// Defines task phases and how they gate participant input
pub trait Phase: Copy + Clone + PartialEq + Send + Sync + std::fmt::Debug + Default {
    fn allows_input(&self) -> bool;
    fn is_finished(&self) -> bool;

    fn is_idle(&self) -> bool {
        false
    }
}
