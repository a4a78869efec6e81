use crate::{
    config::AppConfig,
    db::DbPool,
    services::{
        chat::ChatService, membership::MembershipService, profiles::ProfileService,
        trips::TripService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: DbPool,
    pub profiles: ProfileService,
    pub trips: TripService,
    pub membership: MembershipService,
    pub chat: ChatService,
}

impl AppState {
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let profiles = ProfileService::new(db.clone());
        let trips = TripService::new(db.clone(), profiles.clone());
        let membership = MembershipService::new(db.clone(), trips.clone(), profiles.clone());
        let chat = ChatService::new(db.clone(), trips.clone(), profiles.clone());
        Self {
            config,
            db,
            profiles,
            trips,
            membership,
            chat,
        }
    }
}
