//! Weekly mess ratings and analytics

use super::*;
use crate::mess::{analytics, AnalyticsScope, MessAnalytics, MessRating, MessRatingDraft};

impl<S: IssueStore> LifecycleEngine<S> {
    /// Store a mess rating stamped with the current local week.
    pub fn submit_mess_rating(
        &self,
        draft: MessRatingDraft,
        caller: &User,
    ) -> Result<MessRating, LifecycleError> {
        draft.validate()?;
        let rating = MessRating::new(
            draft,
            Some(caller.id.clone()),
            self.now(),
            &self.config.local_offset(),
        );
        self.storage.save_mess_rating(&rating)?;
        tracing::info!(mess = %rating.mess_name, week = %rating.week_start, "mess rating recorded");
        Ok(rating)
    }

    /// Summarize ratings for one mess, or every mess when `mess` is None.
    pub fn mess_analytics(
        &self,
        mess: Option<&str>,
        scope: AnalyticsScope,
    ) -> Result<MessAnalytics, LifecycleError> {
        self.ensure_available()?;
        let ratings = self.storage.list_mess_ratings()?;
        Ok(analytics(
            &ratings,
            mess,
            scope,
            self.now(),
            &self.config.local_offset(),
        ))
    }
}
