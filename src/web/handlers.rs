use salvo::prelude::*;

/// Placeholder route confirming the scaffold is wired end to end.
#[handler]
pub async fn index(res: &mut Response) {
    res.render(Text::Plain("Diesel migration setup is working!"));
}
