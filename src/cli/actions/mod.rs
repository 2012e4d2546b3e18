pub mod login;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        match self {
            Action::Login(args) => login::execute(args).await,
        }
    }
}
