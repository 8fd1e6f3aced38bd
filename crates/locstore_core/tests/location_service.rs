use locstore_core::db::open_db_in_memory;
use locstore_core::{Location, LocationService, SqliteLocationRepository, WeatherSource};

#[test]
fn service_wraps_repository_calls() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteLocationRepository::try_new(&mut conn).unwrap();
    let mut service = LocationService::new(repo);

    let id = service
        .write_location(&Location::new("101010100", WeatherSource::Cn))
        .unwrap();
    assert_eq!(service.location_count().unwrap(), 1);

    let loaded = service
        .read_location("101010100", WeatherSource::Cn, false)
        .unwrap()
        .unwrap();
    assert_eq!(loaded.id, Some(id));

    assert!(service.delete_location(&loaded).unwrap());
    assert!(service.read_location_list().unwrap().is_empty());
}

#[test]
fn find_by_formatted_id_resolves_both_key_shapes() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteLocationRepository::try_new(&mut conn).unwrap();
    let mut service = LocationService::new(repo);

    let saved = Location::new("2988507", WeatherSource::Owm);
    let mut here = Location::current_position(WeatherSource::Accu);
    here.city = "Here".to_string();
    service
        .write_location_list(&[here.clone(), saved.clone()])
        .unwrap();

    let by_saved = service
        .find_by_formatted_id(&saved.formatted_id())
        .unwrap()
        .unwrap();
    assert_eq!(by_saved.city_id, "2988507");

    let by_current = service
        .find_by_formatted_id("CURRENT_POSITION")
        .unwrap()
        .unwrap();
    assert_eq!(by_current.city, "Here");

    assert!(service.find_by_formatted_id("garbage").unwrap().is_none());
    assert!(service
        .find_by_formatted_id("2988507&ACCU")
        .unwrap()
        .is_none());
}

#[test]
fn read_current_position_is_none_without_slot() {
    let mut conn = open_db_in_memory().unwrap();
    let repo = SqliteLocationRepository::try_new(&mut conn).unwrap();
    let mut service = LocationService::new(repo);

    service
        .write_location(&Location::new("1", WeatherSource::Mf))
        .unwrap();
    assert!(service.read_current_position().unwrap().is_none());

    assert_eq!(service.clear_locations().unwrap(), 1);
    assert_eq!(service.location_count().unwrap(), 0);
}
